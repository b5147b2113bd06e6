use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::RecordError;
use crate::record::{
    LABEL_CONTRACT_ADDRESS, LABEL_DECIMALS, LABEL_NETWORK, LABEL_TOKEN_NAME, LABEL_TOKEN_SYMBOL,
    MACHINE_READABLE_HEADING,
};

/// File names containing any of these (case-insensitive) are never records.
pub const EXCLUDED_MARKERS: &[&str] = &["README", "EXAMPLE"];

const RECORD_EXTENSION: &str = "md";

fn label_regex(label: &str) -> Regex {
    let pattern = format!(r"(?m)^- \*\*{}:\*\* ?(.*?)\r?$", regex::escape(label));
    Regex::new(&pattern).expect("valid record label regex")
}

static TOKEN_NAME_RE: Lazy<Regex> = Lazy::new(|| label_regex(LABEL_TOKEN_NAME));
static TOKEN_SYMBOL_RE: Lazy<Regex> = Lazy::new(|| label_regex(LABEL_TOKEN_SYMBOL));
static DECIMALS_RE: Lazy<Regex> = Lazy::new(|| label_regex(LABEL_DECIMALS));
static CONTRACT_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| label_regex(LABEL_CONTRACT_ADDRESS));
static CHAIN_ID_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?m)^- \*\*{}:\*\* .*\(chain ID (\d+)\)\r?$",
        regex::escape(LABEL_NETWORK)
    );
    Regex::new(&pattern).expect("valid chain id regex")
});

/// The fields verification needs from the latest deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub path: PathBuf,
    pub contract_address: String,
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,
    /// Chain the contract was deployed to. Hand-written records may omit it.
    pub chain_id: Option<u64>,
}

/// Pick the lexicographically greatest record file in `dir`.
pub fn latest_record_path(dir: &Path) -> Result<PathBuf, RecordError> {
    if !dir.is_dir() {
        return Err(RecordError::DirectoryMissing(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|source| RecordError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_record_name(name))
        .collect();
    names.sort();

    let latest = names
        .pop()
        .ok_or_else(|| RecordError::NoRecords(dir.to_path_buf()))?;
    debug!(file = %latest, "latest deployment record selected");
    Ok(dir.join(latest))
}

/// Read and parse the latest record in `dir`.
pub fn read_latest_record(dir: &Path) -> Result<RecordSummary, RecordError> {
    let path = latest_record_path(dir)?;
    let text = std::fs::read_to_string(&path).map_err(|source| RecordError::Io {
        path: path.clone(),
        source,
    })?;
    parse_record(&path, &text)
}

/// Extract the required fields from record text.
///
/// The labelled markdown fields are authoritative. When they cannot be read
/// the embedded JSON projection is tried; if neither yields all fields the
/// label error is returned.
pub fn parse_record(path: &Path, text: &str) -> Result<RecordSummary, RecordError> {
    match parse_labels(path, text) {
        Ok(summary) => Ok(summary),
        Err(label_err) => match parse_embedded_json(path, text) {
            Some(summary) => {
                warn!(
                    file = %path.display(),
                    error = %label_err,
                    "record labels unreadable, using machine-readable section"
                );
                Ok(summary)
            }
            None => Err(label_err),
        },
    }
}

fn parse_labels(path: &Path, text: &str) -> Result<RecordSummary, RecordError> {
    let contract_address = capture(&CONTRACT_ADDRESS_RE, LABEL_CONTRACT_ADDRESS, path, text)?;
    let token_name = capture(&TOKEN_NAME_RE, LABEL_TOKEN_NAME, path, text)?;
    let token_symbol = capture(&TOKEN_SYMBOL_RE, LABEL_TOKEN_SYMBOL, path, text)?;
    let raw_decimals = capture(&DECIMALS_RE, LABEL_DECIMALS, path, text)?;
    let decimals = raw_decimals
        .parse::<u8>()
        .map_err(|_| RecordError::MalformedField {
            field: LABEL_DECIMALS,
            value: raw_decimals.clone(),
            path: path.to_path_buf(),
        })?;

    let chain_id = CHAIN_ID_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .or_else(|| parse_embedded_json(path, text).and_then(|s| s.chain_id));

    Ok(RecordSummary {
        path: path.to_path_buf(),
        contract_address,
        token_name,
        token_symbol,
        decimals,
        chain_id,
    })
}

fn capture(re: &Regex, field: &'static str, path: &Path, text: &str) -> Result<String, RecordError> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RecordError::MissingField {
            field,
            path: path.to_path_buf(),
        })
}

#[derive(Deserialize)]
struct EmbeddedFields {
    contract_address: String,
    token_name: String,
    token_symbol: String,
    decimals: u8,
    #[serde(default)]
    chain_id: Option<u64>,
}

fn parse_embedded_json(path: &Path, text: &str) -> Option<RecordSummary> {
    let mut lines = text
        .lines()
        .skip_while(|line| line.trim() != MACHINE_READABLE_HEADING)
        .skip_while(|line| line.trim() != "```json")
        .skip(1);
    let json = lines.next()?;
    let fields: EmbeddedFields = serde_json::from_str(json).ok()?;
    Some(RecordSummary {
        path: path.to_path_buf(),
        contract_address: fields.contract_address,
        token_name: fields.token_name,
        token_symbol: fields.token_symbol,
        decimals: fields.decimals,
        chain_id: fields.chain_id,
    })
}

fn is_record_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    let has_extension = Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORD_EXTENSION));
    has_extension && !EXCLUDED_MARKERS.iter().any(|m| upper.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample_record;
    use crate::record::write_record;
    use std::fs;

    const LEGACY_RECORD: &str = "# Token Deployment\n\n\
        - **Token Name:** Balkan Hub Token\n\
        - **Token Symbol:** BHT\n\
        - **Decimals:** 18\n\
        - **Contract Address:** 0x9af33524cF693c622311E6A675f29942af647166\n";

    #[test]
    fn round_trip_required_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let record = sample_record();
        write_record(tmp.path(), &record).unwrap();

        let summary = read_latest_record(tmp.path()).unwrap();
        assert_eq!(summary.contract_address, record.contract_address);
        assert_eq!(summary.token_name, record.token_name);
        assert_eq!(summary.token_symbol, record.token_symbol);
        assert_eq!(summary.decimals, record.decimals);
        assert_eq!(summary.chain_id, Some(record.chain_id));
    }

    #[test]
    fn chain_id_read_from_network_line() {
        let text = format!("{LEGACY_RECORD}- **Network:** my (odd) net (chain ID 998)\n");
        let summary = parse_record(Path::new("net.md"), &text).unwrap();
        assert_eq!(summary.chain_id, Some(998));
    }

    #[test]
    fn chain_id_falls_back_to_json_projection() {
        let record = sample_record();
        let md = record.to_markdown().unwrap();
        let text: String = md
            .lines()
            .filter(|line| !line.starts_with("- **Network:**"))
            .map(|line| format!("{line}\n"))
            .collect();
        let summary = parse_record(Path::new("nonet.md"), &text).unwrap();
        assert_eq!(summary.chain_id, Some(999));
    }

    #[test]
    fn round_trip_with_markdown_significant_characters() {
        let names = [
            ("**Bold** Token", "*B*"),
            ("_under_score_", "__U"),
            ("# Hash #1", "#H"),
            ("`code` | pipe", "`C`"),
            ("[link](http://x)", "[L]"),
            ("- **Decimals:** 99", "- **X"),
            ("Ünïcødé ✓", "ÜT"),
        ];
        for (name, symbol) in names {
            let tmp = tempfile::tempdir().unwrap();
            let mut record = sample_record();
            record.token_name = name.into();
            record.token_symbol = symbol.into();
            record.decimals = 6;
            write_record(tmp.path(), &record).unwrap();

            let summary = read_latest_record(tmp.path()).unwrap();
            assert_eq!(summary.token_name, name);
            assert_eq!(summary.token_symbol, symbol);
            assert_eq!(summary.decimals, 6);
            assert_eq!(summary.contract_address, record.contract_address);
        }
    }

    #[test]
    fn missing_directory_is_descriptive() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let err = read_latest_record(&missing).unwrap_err();
        assert!(matches!(err, RecordError::DirectoryMissing(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn empty_directory_is_descriptive() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_latest_record(tmp.path()).unwrap_err();
        assert!(matches!(err, RecordError::NoRecords(_)));
        assert!(err.to_string().contains("No deployment records"));
    }

    #[test]
    fn only_excluded_files_counts_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("README.md"), LEGACY_RECORD).unwrap();
        fs::write(tmp.path().join("example_deployment.md"), LEGACY_RECORD).unwrap();
        fs::write(tmp.path().join("notes.txt"), LEGACY_RECORD).unwrap();
        let err = latest_record_path(tmp.path()).unwrap_err();
        assert!(matches!(err, RecordError::NoRecords(_)));
    }

    #[test]
    fn latest_is_lexicographically_greatest() {
        let tmp = tempfile::tempdir().unwrap();
        let older = LEGACY_RECORD.replace("BHT", "OLD");
        let newer = LEGACY_RECORD.replace("BHT", "NEW");
        fs::write(tmp.path().join("2026-01-01_00-00-00_OLD_9af33524.md"), older).unwrap();
        fs::write(tmp.path().join("2026-02-01_00-00-00_NEW_9af33524.md"), newer).unwrap();
        fs::write(tmp.path().join("README.md"), LEGACY_RECORD).unwrap();

        let summary = read_latest_record(tmp.path()).unwrap();
        assert_eq!(summary.token_symbol, "NEW");
        assert!(summary.path.ends_with("2026-02-01_00-00-00_NEW_9af33524.md"));
    }

    #[test]
    fn collision_suffix_sorts_after_original() {
        let tmp = tempfile::tempdir().unwrap();
        let first = write_record(tmp.path(), &sample_record()).unwrap();
        let mut second = sample_record();
        second.token_name = "Later".into();
        let second_path = write_record(tmp.path(), &second).unwrap();
        assert_ne!(first, second_path);

        let summary = read_latest_record(tmp.path()).unwrap();
        assert_eq!(summary.token_name, "Later");
    }

    #[test]
    fn many_same_second_records_keep_write_order() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..12 {
            let mut record = sample_record();
            record.token_name = format!("Batch {i}");
            write_record(tmp.path(), &record).unwrap();
        }

        let latest = latest_record_path(tmp.path()).unwrap();
        assert!(latest.ends_with("2026-10-16_09-05-07_TST_9af33524_011.md"));
        let summary = read_latest_record(tmp.path()).unwrap();
        assert_eq!(summary.token_name, "Batch 11");
    }

    #[test]
    fn legacy_record_without_json_parses() {
        let summary = parse_record(Path::new("legacy.md"), LEGACY_RECORD).unwrap();
        assert_eq!(summary.token_name, "Balkan Hub Token");
        assert_eq!(summary.token_symbol, "BHT");
        assert_eq!(summary.decimals, 18);
        assert_eq!(
            summary.contract_address,
            "0x9af33524cF693c622311E6A675f29942af647166"
        );
        assert_eq!(summary.chain_id, None);
    }

    #[test]
    fn missing_label_fails_closed_naming_field_and_file() {
        for (label, field) in [
            ("- **Token Name:** Balkan Hub Token\n", "Token Name"),
            ("- **Token Symbol:** BHT\n", "Token Symbol"),
            ("- **Decimals:** 18\n", "Decimals"),
            (
                "- **Contract Address:** 0x9af33524cF693c622311E6A675f29942af647166\n",
                "Contract Address",
            ),
        ] {
            let text = LEGACY_RECORD.replace(label, "");
            let err = parse_record(Path::new("broken.md"), &text).unwrap_err();
            match &err {
                RecordError::MissingField { field: f, path } => {
                    assert_eq!(*f, field);
                    assert_eq!(path, Path::new("broken.md"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn drifted_label_format_fails_closed() {
        let text = LEGACY_RECORD.replace("**Token Symbol:**", "Token Symbol:");
        let err = parse_record(Path::new("drift.md"), &text).unwrap_err();
        assert!(err.to_string().contains("Token Symbol"));
    }

    #[test]
    fn non_numeric_decimals_is_malformed() {
        let text = LEGACY_RECORD.replace("**Decimals:** 18", "**Decimals:** eighteen");
        let err = parse_record(Path::new("bad.md"), &text).unwrap_err();
        assert!(matches!(err, RecordError::MalformedField { .. }));
    }

    #[test]
    fn machine_readable_section_rescues_drifted_labels() {
        let record = sample_record();
        let md = record.to_markdown().unwrap();
        let drifted = md.replace("**Contract Address:**", "Contract Address =");
        let summary = parse_record(Path::new("drift.md"), &drifted).unwrap();
        assert_eq!(summary.contract_address, record.contract_address);
    }

    #[test]
    fn readable_labels_win_over_machine_readable_section() {
        let record = sample_record();
        let md = record
            .to_markdown()
            .unwrap()
            .replace("**Token Name:** Test", "**Token Name:** Edited By Hand");
        let summary = parse_record(Path::new("edited.md"), &md).unwrap();
        assert_eq!(summary.token_name, "Edited By Hand");
    }

    #[test]
    fn incomplete_machine_readable_section_does_not_rescue() {
        let md = sample_record().to_markdown().unwrap();
        let drifted = md
            .replace("**Contract Address:**", "Contract Address =")
            .replace("\"contract_address\"", "\"address\"");
        let err = parse_record(Path::new("drift.md"), &drifted).unwrap_err();
        assert!(err.to_string().contains("Contract Address"));
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let text = LEGACY_RECORD.replace('\n', "\r\n");
        let summary = parse_record(Path::new("crlf.md"), &text).unwrap();
        assert_eq!(summary.token_symbol, "BHT");
    }
}
