use shroud::diagnostics::Verbosity;
use shroud::discovery::{collect_document_pairs, DiscoveryConfig};
use shroud::label_map::LabelMap;
use shroud::masker::MaskOptions;
use shroud::pipeline::{process_corpus, write_run_stats, PipelineConfig, RunStats};
use tempfile::TempDir;

struct CorpusFixture {
    input: TempDir,
    tagged: TempDir,
    output: TempDir,
}

impl CorpusFixture {
    fn new() -> Self {
        Self {
            input: TempDir::new().unwrap(),
            tagged: TempDir::new().unwrap(),
            output: TempDir::new().unwrap(),
        }
    }

    async fn add_document(&self, stem: &str, text: &str, annotations: &str) {
        tokio::fs::write(self.input.path().join(format!("{stem}.txt")), text)
            .await
            .unwrap();
        tokio::fs::write(self.tagged.path().join(format!("{stem}.ann")), annotations)
            .await
            .unwrap();
    }

    async fn masked_text(&self, stem: &str) -> String {
        tokio::fs::read_to_string(self.output.path().join(format!("{stem}.txt")))
            .await
            .unwrap()
    }

    async fn run(&self, config: &PipelineConfig, table: Option<&LabelMap>) -> RunStats {
        let pairs = collect_document_pairs(
            self.input.path(),
            self.tagged.path(),
            DiscoveryConfig::default(),
        )
        .await
        .unwrap();
        process_corpus(&pairs, self.output.path(), table, config)
            .await
            .unwrap()
    }
}

fn quiet_config() -> PipelineConfig {
    PipelineConfig {
        mask: MaskOptions {
            verbosity: Verbosity::Quiet,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_corpus_end_to_end() {
    let fixture = CorpusFixture::new();
    fixture
        .add_document(
            "letter",
            "John Smith lives in NYC.",
            "T1\tPERSON 0 10\tJohn Smith\nT2\tLOCATION 20 23\tNYC\n",
        )
        .await;
    fixture
        .add_document("empty", "Nothing to hide here.", "")
        .await;

    let run = fixture.run(&quiet_config(), None).await;

    assert_eq!(run.files_discovered, 2);
    assert_eq!(run.files_masked, 2);
    assert_eq!(run.spans_masked, 2);
    assert_eq!(fixture.masked_text("letter").await, "PERSON lives in LOCATION.");
    assert_eq!(fixture.masked_text("empty").await, "Nothing to hide here.");
}

#[tokio::test]
async fn test_corpus_with_custom_table() {
    let fixture = CorpusFixture::new();
    fixture
        .add_document(
            "letter",
            "John Smith lives in NYC.",
            "T1\tPERSON 0 10\tJohn Smith\nT2\tLOCATION 20 23\tNYC\n",
        )
        .await;

    let table = LabelMap::parse("PERSON\t[REDACTED]\n").unwrap();
    let run = fixture.run(&quiet_config(), Some(&table)).await;

    assert_eq!(run.files_masked, 1);
    assert_eq!(
        fixture.masked_text("letter").await,
        "[REDACTED] lives in LOCATION."
    );
}

#[tokio::test]
async fn test_unpaired_document_skipped() {
    let fixture = CorpusFixture::new();
    fixture
        .add_document("paired", "Jane Doe was here.", "T1\tPERSON 0 8\tJane Doe\n")
        .await;
    tokio::fs::write(fixture.input.path().join("orphan.txt"), "no partner")
        .await
        .unwrap();

    let run = fixture.run(&quiet_config(), None).await;

    assert_eq!(run.files_discovered, 2);
    assert_eq!(run.files_masked, 1);
    assert_eq!(run.files_skipped, 1);
    assert!(!fixture.output.path().join("orphan.txt").exists());
}

#[tokio::test]
async fn test_annotation_noise_is_counted() {
    let fixture = CorpusFixture::new();
    fixture
        .add_document(
            "noisy",
            "John Smith lives in NYC.",
            concat!(
                "#1\tAnnotatorNotes T1\tchecked\n",
                "T1\tPERSON 0 10\tJohn Smith\n",
                "T2\tPERSON 5 15\tSmith live\n",
                "T3\tbroken line\n",
            ),
        )
        .await;

    let run = fixture.run(&quiet_config(), None).await;

    assert_eq!(run.files_masked, 1);
    assert_eq!(run.spans_masked, 1);
    assert_eq!(run.overlaps_dropped, 1);
    assert_eq!(run.malformed_lines, 1);
    assert_eq!(fixture.masked_text("noisy").await, "PERSON lives in NYC.");
}

#[tokio::test]
async fn test_mmap_reader_matches_buffered() {
    let fixture = CorpusFixture::new();
    fixture
        .add_document(
            "doc",
            "Åsa Öberg bor i Umeå.",
            "T1\tPERSON 0 9\tÅsa Öberg\nT2\tCITY 16 20\tUmeå\n",
        )
        .await;

    let mut config = quiet_config();
    config.reader.use_mmap = true;
    let run = fixture.run(&config, None).await;

    assert_eq!(run.files_masked, 1);
    assert_eq!(fixture.masked_text("doc").await, "PERSON bor i CITY.");
}

#[tokio::test]
async fn test_stats_file_structure() {
    let fixture = CorpusFixture::new();
    fixture
        .add_document(
            "letter",
            "John Smith lives in NYC.",
            "T1\tPERSON 0 10\tJohn Smith\n",
        )
        .await;

    let run = fixture.run(&quiet_config(), None).await;
    let stats_path = fixture.output.path().join("run_stats.json");
    write_run_stats(&run, &stats_path).await.unwrap();

    let content = tokio::fs::read_to_string(&stats_path).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();

    let obj = value.as_object().unwrap();
    assert!(obj.contains_key("files_discovered"));
    assert!(obj.contains_key("files_masked"));
    assert!(obj.contains_key("total_processing_time_ms"));

    let file_stats = obj["file_stats"].as_array().unwrap();
    assert_eq!(file_stats.len(), 1);
    let file_obj = file_stats[0].as_object().unwrap();
    assert_eq!(file_obj["stem"], "letter");
    assert_eq!(file_obj["status"], "masked");
    assert_eq!(file_obj["spans_masked"], 1);
}

#[tokio::test]
async fn test_subdirectory_document_lands_flat_in_output() {
    let fixture = CorpusFixture::new();
    let nested = fixture.input.path().join("batch1");
    tokio::fs::create_dir_all(&nested).await.unwrap();
    tokio::fs::write(nested.join("deep.txt"), "Jane Doe was here.")
        .await
        .unwrap();
    tokio::fs::write(
        fixture.tagged.path().join("deep.ann"),
        "T1\tPERSON 0 8\tJane Doe\n",
    )
    .await
    .unwrap();

    let run = fixture.run(&quiet_config(), None).await;

    assert_eq!(run.files_masked, 1);
    assert_eq!(fixture.masked_text("deep").await, "PERSON was here.");
}

#[tokio::test]
async fn test_parallel_run_masks_everything() {
    let fixture = CorpusFixture::new();
    for i in 0..6 {
        fixture
            .add_document(
                &format!("doc{i}"),
                "John Smith lives in NYC.",
                "T1\tPERSON 0 10\tJohn Smith\nT2\tLOCATION 20 23\tNYC\n",
            )
            .await;
    }

    let mut config = quiet_config();
    config.parallel = true;
    let run = fixture.run(&config, None).await;

    assert_eq!(run.files_masked, 6);
    assert_eq!(run.spans_masked, 12);
    for i in 0..6 {
        assert_eq!(
            fixture.masked_text(&format!("doc{i}")).await,
            "PERSON lives in LOCATION."
        );
    }
}
