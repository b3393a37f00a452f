#[cfg(test)]
mod tests {
    use crate::catalog::{Catalog, Corpus, ScenarioBlock};
    use crate::config::{GeneratorConfig, Profile};
    use crate::models::{column, LogRecord, Scenario, COLUMNS, FIELD_COUNT};
    use crate::writer::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn corpus(profile: Profile, seed: u64) -> Corpus {
        let mut config = GeneratorConfig::new(profile);
        config.seed = Some(seed);
        Catalog::new(config).unwrap().generate()
    }

    fn record_with(destination: &str, user_agent: &str) -> LogRecord {
        let mut fields: Vec<String> = vec!["None".to_string(); FIELD_COUNT];
        fields[column::TIMESTAMP] = "Mon Jan 15 08:00:00 2024".to_string();
        fields[column::DESTINATION] = destination.to_string();
        fields[column::USER_AGENT] = user_agent.to_string();
        LogRecord::try_from(fields).unwrap()
    }

    fn write_to_string(corpus: &Corpus, include_header: bool) -> String {
        let mut writer = CorpusWriter::from_writer(Vec::new(), include_header);
        writer.write_corpus(corpus).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_header_row() {
        let corpus = corpus(Profile::Comprehensive, 1);
        let output = write_to_string(&corpus, true);
        let mut lines = output.lines();

        assert_eq!(lines.next().unwrap(), COLUMNS.join(","));
        assert_eq!(lines.count(), corpus.len());
    }

    #[test]
    fn test_no_header_row() {
        let corpus = corpus(Profile::Randomized, 1);
        let output = write_to_string(&corpus, false);

        assert_eq!(output.lines().count(), corpus.len());
        assert!(output.starts_with("Mon Jan 15 08:00:00 2024,"));
        assert!(output.ends_with('\n'));
        assert!(!output.contains('\r'));
    }

    #[test]
    fn test_plain_fields_unquoted() {
        let corpus = corpus(Profile::Comprehensive, 1);
        let output = write_to_string(&corpus, false);
        let first = output.lines().next().unwrap();

        assert!(!first.contains('"'));
        assert_eq!(first.split(',').count(), FIELD_COUNT);
    }

    #[test]
    fn test_fields_with_separators_are_quoted() {
        let record = record_with("example.com/a,b", "Agent \"X\"");
        let mut writer = CorpusWriter::from_writer(Vec::new(), false);
        writer.write_record(&record).unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert!(output.contains("\"example.com/a,b\""));
        assert!(output.contains("\"Agent \"\"X\"\"\""));

        let records = read_records(output.as_bytes(), false).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_write_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("comprehensive_test_logs.csv");
        let corpus = corpus(Profile::Comprehensive, 1);

        let written = write_corpus_to_path(&path, &corpus, true).unwrap();
        assert_eq!(written, 66);

        let records = read_corpus(&path, true).unwrap();
        let expected: Vec<LogRecord> = corpus.records().cloned().collect();
        assert_eq!(records, expected);
    }

    #[test]
    fn test_header_only_written_once() {
        let record = record_with("google.com", "Mozilla/5.0");
        let mut writer = CorpusWriter::from_writer(Vec::new(), true);
        writer.write_header().unwrap();
        writer.write_record(&record).unwrap();
        writer.write_record(&record).unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert_eq!(output.lines().count(), 3);
        assert_eq!(output.matches("timestamp,").count(), 1);
    }

    #[test]
    fn test_empty_corpus() {
        let empty = Corpus {
            profile: Profile::Comprehensive,
            seed: None,
            blocks: vec![ScenarioBlock {
                scenario: Scenario::Baseline,
                records: vec![],
            }],
        };

        let with_header = write_to_string(&empty, true);
        assert_eq!(with_header, format!("{}\n", COLUMNS.join(",")));
        assert!(write_to_string(&empty, false).is_empty());
    }

    #[test]
    fn test_same_seed_byte_identical_files() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.csv");
        let second = temp_dir.path().join("second.csv");

        write_corpus_to_path(&first, &corpus(Profile::Randomized, 42), false).unwrap();
        write_corpus_to_path(&second, &corpus(Profile::Randomized, 42), false).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_output_file_is_truncated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs.csv");
        fs::write(&path, "stale content\n".repeat(1000)).unwrap();

        write_corpus_to_path(&path, &corpus(Profile::Comprehensive, 1), false).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert_eq!(content.lines().count(), 66);
    }

    #[test]
    fn test_unwritable_path() {
        let corpus = corpus(Profile::Comprehensive, 1);
        let err = write_corpus_to_path(Path::new("/nonexistent/dir/logs.csv"), &corpus, true)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to create output file"));
    }

    #[test]
    fn test_short_row_reports_line() {
        let good = record_with("google.com", "Mozilla/5.0");
        let mut writer = CorpusWriter::from_writer(Vec::new(), false);
        writer.write_record(&good).unwrap();
        let mut output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        output.push_str("Mon Jan 15 08:00:01 2024,it-acme-corp,HTTP\n");

        let err = read_records(output.as_bytes(), false).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("line 2"), "{}", message);
        assert!(message.contains("found 3"), "{}", message);
    }

    #[test]
    fn test_unexpected_header_rejected() {
        let input = "a,b,c\n";
        assert!(read_records(input.as_bytes(), true).is_err());
    }

    #[test]
    fn test_missing_corpus_file() {
        let err = read_corpus(Path::new("/nonexistent/logs.csv"), false).unwrap_err();
        assert!(err.to_string().contains("Failed to open corpus file"));
    }
}
