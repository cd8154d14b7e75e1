use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use worm_ingest::config::InputPaths;
use worm_ingest::domain::{Term, Triple, Worm};
use worm_ingest::error::ErrorKind;
use worm_ingest::pipeline::inference::{infer, HornRuleEngine};
use worm_ingest::pipeline::storage::{FactStore, InMemoryFactStore, SqliteFactStore};
use worm_ingest::pipeline::{Pipeline, RunReport, StageStatus};

const OW: &str = "http://openworm.org/entities/";
const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

fn ow(local: &str) -> Term {
    Term::iri(format!("{OW}{local}"))
}

fn rdf(local: &str) -> Term {
    Term::iri(format!("{RDF}{local}"))
}

fn write_db(path: &Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE tblentity (id INTEGER PRIMARY KEY, Entity TEXT);
        CREATE TABLE tblrelationship (EnID1 INTEGER, Relation INTEGER, EnID2 INTEGER);
        INSERT INTO tblentity VALUES (1, 'neuron'), (1519, 'muscle'),
            (10, 'AVAL'), (11, 'AVBL'), (12, 'DA01'), (20, 'MDL08');
        INSERT INTO tblrelationship VALUES
            (10, 1515, 1), (11, 1515, 1), (12, 1515, 1),
            (20, 1515, 1519),
            (12, 1516, 20);
        "#,
    )
    .unwrap();
}

struct Fixture {
    _dir: TempDir,
    inputs: InputPaths,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("celegans.db");
    write_db(&db);

    let edgelist = dir.path().join("edgelist.csv");
    fs::write(
        &edgelist,
        "pre,post,weight,type\n\
         AVAL,AVBL,5,chemical\n\
         AVAL,AVBL,3,chemical\n\
         AVAL,DA01,1,electrical\n\
         AVAL,PVDR,2,chemical\n",
    )
    .unwrap();

    let inputs = InputPaths {
        celegans_db: Some(db),
        edgelist: Some(edgelist),
        ..InputPaths::default()
    };
    Fixture { _dir: dir, inputs }
}

async fn ingest(inputs: &InputPaths, store: &dyn FactStore) -> RunReport {
    let mut pipeline = Pipeline::from_inputs(inputs, None).unwrap();
    let mut worm = Worm::new();
    pipeline.run(&mut worm, store).await.unwrap()
}

fn rules_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/inference_rules.toml")
}

#[tokio::test]
async fn test_edgelist_weights_are_summed_per_key() {
    let fixture = fixture();
    let store = InMemoryFactStore::new();
    let report = ingest(&fixture.inputs, &store).await;

    for stage in ["neurons", "muscles", "connections"] {
        assert!(report.stage(stage).unwrap().succeeded(), "{stage} failed");
    }
    assert!(matches!(
        report.stage("lineage").unwrap().status,
        StageStatus::Skipped { .. }
    ));

    let triples = store.triples().await.unwrap();
    let chemical = ow("Connection/AVAL/AVBL/send");
    assert!(triples.contains(&Triple::new(chemical.clone(), ow("number"), Term::Integer(8))));
    assert!(!triples
        .iter()
        .any(|t| t.subject == chemical && t.object == Term::Integer(5)));
    // zero padding is stripped on both sides
    assert!(triples.contains(&Triple::new(
        ow("Connection/AVAL/DA1/gapJunction"),
        ow("number"),
        Term::Integer(1)
    )));
    // PVDR is not in the network
    assert!(!triples.iter().any(|t| t.object == ow("Neuron/PVDR")));
    assert_eq!(report.store_triples, triples.len());
}

#[tokio::test]
async fn test_rerun_duplicates_facts() {
    let fixture = fixture();
    let store = InMemoryFactStore::new();
    ingest(&fixture.inputs, &store).await;
    let first = store.len().await.unwrap();
    ingest(&fixture.inputs, &store).await;
    assert_eq!(store.len().await.unwrap(), first * 2);
}

#[tokio::test]
async fn test_malformed_source_fails_only_its_stage() {
    let mut fixture = fixture();
    let lineage = fixture._dir.path().join("cells.tsv");
    fs::write(&lineage, "Cell\tLineage\tDescription\nAVAL\tAB alaappaaa\n").unwrap();
    fixture.inputs.lineage = Some(lineage);

    let store = InMemoryFactStore::new();
    let report = ingest(&fixture.inputs, &store).await;

    match &report.stage("lineage").unwrap().status {
        StageStatus::Failed { kind, .. } => assert_eq!(*kind, ErrorKind::SourceFormat),
        other => panic!("expected lineage to fail, got {:?}", other),
    }
    assert_eq!(report.failed_stages().len(), 1);
    assert!(report.stage("connections").unwrap().succeeded());
    assert!(store
        .triples()
        .await
        .unwrap()
        .iter()
        .all(|t| t.predicate != ow("lineageName")));
}

#[tokio::test]
async fn test_every_statement_has_evidence() {
    let fixture = fixture();
    let store = InMemoryFactStore::new();
    ingest(&fixture.inputs, &store).await;
    let triples = store.triples().await.unwrap();

    let statements: HashSet<&Term> = triples
        .iter()
        .filter(|t| t.predicate == rdf("type") && t.object == rdf("Statement"))
        .map(|t| &t.subject)
        .collect();
    let asserted: HashSet<&Term> = triples
        .iter()
        .filter(|t| t.predicate == ow("asserts"))
        .map(|t| &t.object)
        .collect();
    assert!(!statements.is_empty());
    assert!(statements.is_subset(&asserted));
}

#[tokio::test]
async fn test_inference_only_adds_triples() {
    let fixture = fixture();
    let store = InMemoryFactStore::new();
    ingest(&fixture.inputs, &store).await;
    let before = store.triples().await.unwrap();

    let engine = HornRuleEngine::load(&rules_path(), 16).unwrap();
    let report = infer(&store, &engine).await.unwrap();
    let after = store.triples().await.unwrap();

    assert!(report.inserted > 0);
    assert_eq!(after.len(), before.len() + report.inserted);
    assert_eq!(&after[..before.len()], before.as_slice());
    assert!(after.contains(&Triple::new(ow("Neuron/AVAL"), ow("connectsTo"), ow("Neuron/AVBL"))));
    assert!(after.contains(&Triple::new(
        ow("Neuron/DA1"),
        ow("gapJunctionWith"),
        ow("Neuron/AVAL")
    )));
    assert!(after.contains(&Triple::new(ow("Neuron/DA1"), ow("innervates"), ow("Muscle/MDL08"))));
}

#[tokio::test]
async fn test_sqlite_store_survives_reopen() {
    let fixture = fixture();
    let path = fixture._dir.path().join("facts.db");
    let written = {
        let store = SqliteFactStore::open(&path).unwrap();
        ingest(&fixture.inputs, &store).await;
        store.close().await.unwrap();
        store.triples().await.unwrap()
    };

    let reopened = SqliteFactStore::open(&path).unwrap();
    assert_eq!(reopened.triples().await.unwrap(), written);
}
