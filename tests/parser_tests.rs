//! Env file parsing tests
//!
//! Tests for the line parser through the public loader API, covering
//! comments, secrets, multiline values and malformed input.

use std::io::Write;

use tempfile::NamedTempFile;
use vaultenv::{EnvParser, EnvSnapshot, FileLoader, Loader, VaultenvError};

fn load(contents: &str) -> vaultenv::Result<EnvSnapshot> {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    FileLoader::new(file.path()).load(&EnvParser::new().unwrap())
}

#[cfg(test)]
mod parse_file_tests {
    use super::*;

    #[test]
    fn test_only_plain() {
        let snapshot = load(
            "
            PLAIN=plaintext
            PLAIN_ZERO=subzero
            ",
        )
        .unwrap();

        assert_eq!(snapshot.get_plain("PLAIN"), Some("plaintext"));
        assert_eq!(snapshot.get_plain("PLAIN_ZERO"), Some("subzero"));
        assert!(snapshot.secrets().is_empty());
    }

    #[test]
    fn test_comments_with_plain() {
        let snapshot = load(
            "
            #comment
            PLAIN=plaintext
            #now he's
            PLAIN_ZERO=subzero
            #PLAIN=another
            ",
        )
        .unwrap();

        assert_eq!(snapshot.plain().len(), 2);
        assert_eq!(snapshot.get_plain("PLAIN"), Some("plaintext"));
    }

    #[test]
    fn test_plain_and_secrets() {
        let snapshot = load(
            "
            PLAIN=plaintext
            SECRET_PASSWORD=!{is it the red or the white?}
            ",
        )
        .unwrap();

        assert_eq!(snapshot.get_plain("PLAIN"), Some("plaintext"));
        assert_eq!(
            snapshot.get_secret("SECRET_PASSWORD"),
            Some("is it the red or the white?")
        );
    }

    #[test]
    fn test_multiline_between_other_entries() {
        let snapshot = load(
            "FIRST=1
JWT_KEY=\"-----BEGIN KEY-----
MIIBOgIBAAJBAKj34GkxFhD90vcNLYLInFEX6Ppy1tPf9Cnzj4p4WGeKLs1Pt8Qu
-----END KEY-----\"
LAST=!{keys/last}
",
        )
        .unwrap();

        assert_eq!(snapshot.get_plain("FIRST"), Some("1"));
        assert_eq!(
            snapshot.get_plain("JWT_KEY"),
            Some("-----BEGIN KEY-----\nMIIBOgIBAAJBAKj34GkxFhD90vcNLYLInFEX6Ppy1tPf9Cnzj4p4WGeKLs1Pt8Qu\n-----END KEY-----")
        );
        assert_eq!(snapshot.get_secret("LAST"), Some("keys/last"));
    }

    #[test]
    fn test_parsing_twice_is_equal() {
        let contents = "A=1\nB=!{b}\nC=\"x\ny\"\n";
        assert_eq!(load(contents).unwrap(), load(contents).unwrap());
    }
}

#[cfg(test)]
mod malformed_input_tests {
    use super::*;

    #[test]
    fn test_malformed_lines_abort_the_parse() {
        let cases = vec![
            ("empty secret", "GOOD=1\nKEY=!{}\n"),
            ("no separator", "GOOD=1\nJUST_A_WORD\n"),
            ("empty key", "GOOD=1\n=value\n"),
            ("unterminated multiline", "GOOD=1\nKEY=\"open\nnever closed\n"),
        ];

        for (name, contents) in cases {
            match load(contents) {
                Err(VaultenvError::MalformedLine { .. }) => {}
                other => panic!("case '{}' should be malformed, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_error_names_offending_line() {
        let err = load("OK=1\n  this line is wrong  \n").unwrap_err();
        assert!(err.to_string().contains("this line is wrong"));
    }
}
