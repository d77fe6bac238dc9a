#![allow(dead_code)]

use serde_json::{json, Value};

pub fn protein(uniprot: &str) -> Value {
    json!({
        "ac": format!("EBI-{}", uniprot),
        "short_label": uniprot.to_lowercase(),
        "interactor_type": {"mi": "MI:0326", "short_label": "protein"},
        "taxid": 9606,
        "xrefs": [{"database": "uniprotkb", "id": uniprot, "qualifier": "identity"}]
    })
}

pub fn pair(ac: &str, experiment_ac: &str, bait: &str, prey: &str) -> Value {
    json!({
        "ac": ac,
        "short_label": ac.to_lowercase(),
        "interaction_type": {"mi": "MI:0407", "short_label": "direct interaction"},
        "experiment_acs": [experiment_ac],
        "participants": [
            {
                "interactor": protein(bait),
                "experimental_role": {"mi": "MI:0496", "short_label": "bait"},
                "biological_role": {"mi": "MI:0499", "short_label": "unspecified role"}
            },
            {
                "interactor": protein(prey),
                "experimental_role": {"mi": "MI:0498", "short_label": "prey"},
                "biological_role": {"mi": "MI:0499", "short_label": "unspecified role"}
            }
        ]
    })
}

pub fn experiment(ac: &str, method_mi: &str, method_label: &str, publication_ac: &str) -> Value {
    json!({
        "ac": ac,
        "short_label": ac.to_lowercase(),
        "detection_method": {"mi": method_mi, "short_label": method_label},
        "publication_ac": publication_ac
    })
}

pub fn publication(ac: &str, pubmed: &str, status: &str, experiment_acs: &[&str], imex_curated: bool) -> Value {
    let annotations = if imex_curated {
        json!([{"topic": "curation depth", "text": "imex curation"}])
    } else {
        json!([])
    };
    json!({
        "ac": ac,
        "pubmed_id": pubmed,
        "title": format!("Paper {}", pubmed),
        "authors": ["Smith J", "Doe A"],
        "year": 2010,
        "status": status,
        "institution": "IntAct",
        "curator": "curator1",
        "experiment_acs": experiment_acs,
        "annotations": annotations
    })
}

/// P1-P2 seen by pull down in two released papers, P1-P3 by one two hybrid,
/// P4-P5 only in a paper still under curation.
pub fn export_dataset() -> Value {
    json!({
        "publications": [
            publication("EBI-P1", "1001", "released", &["EBI-E1", "EBI-E3"], true),
            publication("EBI-P2", "2002", "released", &["EBI-E2"], false),
            publication("EBI-P3", "3003", "curation", &["EBI-E4"], true)
        ],
        "experiments": [
            experiment("EBI-E1", "MI:0096", "pull down", "EBI-P1"),
            experiment("EBI-E2", "MI:0096", "pull down", "EBI-P2"),
            experiment("EBI-E3", "MI:0018", "two hybrid", "EBI-P1"),
            experiment("EBI-E4", "MI:0096", "pull down", "EBI-P3")
        ],
        "interactions": [
            pair("EBI-I1", "EBI-E1", "P1", "P2"),
            pair("EBI-I2", "EBI-E2", "P2", "P1"),
            pair("EBI-I3", "EBI-E3", "P1", "P3"),
            pair("EBI-I4", "EBI-E4", "P4", "P5")
        ]
    })
}

pub fn write_dataset(dir: &std::path::Path, dataset: &Value) -> std::path::PathBuf {
    let path = dir.join("dataset.json");
    std::fs::write(&path, serde_json::to_vec_pretty(dataset).unwrap()).unwrap();
    path
}
