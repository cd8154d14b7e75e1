/// Stage names (used on the CLI and in run reports)
pub const NEURONS_STAGE: &str = "neurons";
pub const MUSCLES_STAGE: &str = "muscles";
pub const ANNOTATIONS_STAGE: &str = "annotations";
pub const LINEAGE_STAGE: &str = "lineage";
pub const CONNECTIONS_STAGE: &str = "connections";

/// Source tags attached to records by each adapter
pub const CELEGANS_DB_SOURCE: &str = "celegans-sqlite";
pub const NEURON_CONNECT_SOURCE: &str = "wormatlas-neuronconnect";
pub const EDGELIST_SOURCE: &str = "wormwiring-edgelist";
pub const CELL_LIST_SOURCE: &str = "wormatlas-celllist";

/// Evidence provider keys, matched case-insensitively as substrings of a source tag
pub const ALTUN_PROVIDER: &str = "altun";
pub const WORMATLAS_PROVIDER: &str = "wormatlas";
pub const CELEGANS_DB_PROVIDER: &str = "celegans";
pub const NEURON_CONNECT_PROVIDER: &str = "neuronconnect";
pub const WORMWIRING_PROVIDER: &str = "wormwiring";
pub const CELL_LIST_PROVIDER: &str = "celllist";

pub const CELEGANS_DB_TITLE: &str = "C. elegans sqlite database";
pub const NEURON_CONNECT_URI: &str =
    "http://www.wormatlas.org/neuronalwiring.html#Connectivitydata";
pub const WORMWIRING_URI: &str = "http://www.wormwiring.org";
pub const CELL_LIST_URI: &str = "http://www.wormatlas.org/celllist.htm";

/// Graph namespaces
pub const ENTITY_NS: &str = "http://openworm.org/entities/";
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Relation codes in the relational dump
pub const REL_IS_A: &str = "1515";
pub const REL_INNERVATED_BY: &str = "1516";
pub const ENTITY_NEURON: &str = "1";
pub const ENTITY_MUSCLE: &str = "1519";

/// Default organism identifiers for the singleton worm and network entities
pub const WORM_NAME: &str = "celegans";
pub const NETWORK_NAME: &str = "celegans";

/// Expand a `prefix:local` name used in rule files into a full IRI.
pub fn expand_prefixed(term: &str) -> Option<String> {
    let (prefix, local) = term.split_once(':')?;
    match prefix {
        "ow" => Some(format!("{ENTITY_NS}{local}")),
        "rdf" => Some(format!("{RDF_NS}{local}")),
        _ => None,
    }
}

/// Get all stage names in their default execution order
pub fn get_stage_order() -> Vec<&'static str> {
    vec![
        NEURONS_STAGE,
        MUSCLES_STAGE,
        ANNOTATIONS_STAGE,
        LINEAGE_STAGE,
        CONNECTIONS_STAGE,
    ]
}
