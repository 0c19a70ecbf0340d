use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use reelmatch_core::catalog::{read_records, CatalogRecord};
use reelmatch_core::persist::{read_header, save_model};
use reelmatch_core::{Catalog, FeatureBuilder, FeatureConfig, TrainedModel, VectorizerConfig};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "reelmatch-indexer")]
#[command(about = "Fit and inspect title recommendation models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model from JSON/JSONL catalog files and write the artifact
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output artifact path
        #[arg(long)]
        output: String,
        /// Contributors kept per title, in billing order
        #[arg(long, default_value_t = 3)]
        max_contributors: usize,
        /// Drop tokens found in fewer documents than this
        #[arg(long, default_value_t = 1)]
        min_df: u32,
        /// Keep English stop words in documents
        #[arg(long, default_value_t = false)]
        no_stop_words: bool,
        /// Skip titles with fewer votes than this
        #[arg(long, default_value_t = 0)]
        min_votes: u64,
    },
    /// Print the header and size of an existing artifact
    Inspect {
        #[arg(long)]
        artifact: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, max_contributors, min_df, no_stop_words, min_votes } => {
            let features = FeatureConfig { max_contributors };
            let vectorizer = VectorizerConfig { min_df, stop_words: !no_stop_words };
            build_model(Path::new(&input), Path::new(&output), features, vectorizer, min_votes)
        }
        Commands::Inspect { artifact } => inspect(Path::new(&artifact)),
    }
}

fn catalog_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }
    Ok(files)
}

fn build_model(input: &Path, output: &Path, features: FeatureConfig, vectorizer: VectorizerConfig, min_votes: u64) -> Result<()> {
    let mut records: Vec<CatalogRecord> = Vec::new();
    for file in catalog_files(input)? {
        let batch = read_records(&file)?;
        tracing::debug!(file = %file.display(), records = batch.len(), "read catalog file");
        records.extend(batch);
    }
    tracing::info!(records = records.len(), "ingested catalog records");

    let builder = FeatureBuilder::new(features.clone());
    let catalog = Catalog::from_records(records, &builder, min_votes)?;
    let model = TrainedModel::fit(catalog, features, vectorizer)?;
    save_model(&model, output)?;

    tracing::info!(output = %output.display(), rows = model.num_rows(), terms = model.vocabulary.len(), "model build complete");
    Ok(())
}

fn inspect(artifact: &Path) -> Result<()> {
    let header = read_header(artifact)?;
    let bytes = std::fs::metadata(artifact)?.len();
    tracing::info!(
        artifact = %artifact.display(),
        schema_version = header.schema_version,
        rows = header.num_rows,
        terms = header.num_terms,
        bytes,
        "artifact header"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelmatch_core::load_model;
    use tempfile::tempdir;

    #[test]
    fn builds_from_a_directory_of_catalog_files() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("catalog");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::write(
            input.join("a.jsonl"),
            concat!(
                r#"{"id":"tt1","title":"Inception","genres":"Sci-Fi,Thriller","director_names":["Christopher Nolan"],"start_year":2010,"num_votes":10}"#,
                "\n\n",
                r#"{"id":"tt2","title":"Interstellar","genres":["Sci-Fi","Drama"],"contributors":["Christopher Nolan"],"release_year":2014,"vote_count":8}"#,
                "\n"
            ),
        )
        .unwrap();
        std::fs::write(input.join("b.json"), r#"[{"tconst":"tt3","primary_title":"Obscure","num_votes":1}]"#).unwrap();
        std::fs::write(input.join("notes.txt"), "ignored").unwrap();

        let output = dir.path().join("out/model.bin");
        build_model(&input, &output, FeatureConfig::default(), VectorizerConfig::default(), 5).unwrap();

        let model = load_model(&output).unwrap();
        assert_eq!(model.num_rows(), 2);
        assert_eq!(model.item(0).unwrap().document, "sci-fi thriller christophernolan 2010");
        assert!(inspect(&output).is_ok());
    }

    fn featureless_catalog(dir: &Path) -> PathBuf {
        let input = dir.join("featureless.jsonl");
        std::fs::write(&input, "{\"id\":\"tt1\",\"title\":\"Untitled\"}\n{\"id\":\"tt2\",\"title\":\"Also Untitled\"}\n").unwrap();
        input
    }

    fn is_empty_corpus(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<reelmatch_core::Error>(), Some(reelmatch_core::Error::EmptyCorpus(_)))
    }

    #[test]
    fn empty_corpus_writes_no_artifact() {
        let dir = tempdir().unwrap();
        let input = featureless_catalog(dir.path());
        let output = dir.path().join("out/model.bin");

        let err = build_model(&input, &output, FeatureConfig::default(), VectorizerConfig::default(), 0).unwrap_err();
        assert!(is_empty_corpus(&err), "{err}");
        assert!(!output.exists());
    }

    #[test]
    fn empty_corpus_keeps_previous_artifact() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.jsonl");
        std::fs::write(&good, r#"{"id":"tt1","title":"Inception","genres":["Sci-Fi"],"release_year":2010}"#).unwrap();
        let output = dir.path().join("model.bin");
        build_model(&good, &output, FeatureConfig::default(), VectorizerConfig::default(), 0).unwrap();
        let before = std::fs::read(&output).unwrap();

        let input = featureless_catalog(dir.path());
        let err = build_model(&input, &output, FeatureConfig::default(), VectorizerConfig::default(), 0).unwrap_err();
        assert!(is_empty_corpus(&err), "{err}");
        assert_eq!(std::fs::read(&output).unwrap(), before);
        assert_eq!(load_model(&output).unwrap().num_rows(), 1);
    }

    #[test]
    fn missing_input_fails_without_writing() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("model.bin");
        let err = build_model(&dir.path().join("nope"), &output, FeatureConfig::default(), VectorizerConfig::default(), 0);
        assert!(err.is_err());
        assert!(!output.exists());
    }
}
