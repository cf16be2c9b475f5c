//! Normalizer - Canonical ordering of generated configuration
//!
//! Attributes come first in key order, then blocks ordered by identifier
//! and labels, at every nesting level. Documents that differ only in the
//! order of their attributes or blocks normalize to the same text.

use hcl::{Attribute, Block, Body, Structure};

/// Normalize `text`. Input that does not parse is returned unchanged.
pub fn normalize(text: &str) -> String {
    let body = match hcl::parse(text) {
        Ok(body) => body,
        Err(e) => {
            log::debug!("Skipping normalization of unparsable input: {}", e);
            return text.to_string();
        }
    };

    match hcl::format::to_string(&sort_body(body)) {
        Ok(normalized) => normalized,
        Err(e) => {
            log::warn!("Failed to serialize normalized configuration: {}", e);
            text.to_string()
        }
    }
}

/// Check that `text` is structurally valid configuration
pub fn validate(text: &str) -> Result<(), String> {
    hcl::parse(text).map(|_| ()).map_err(|e| e.to_string())
}

/// Whether two documents are equal after normalization
pub fn equivalent(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn sort_body(body: Body) -> Body {
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut blocks: Vec<Block> = Vec::new();
    for structure in body {
        match structure {
            Structure::Attribute(attribute) => attributes.push(attribute),
            Structure::Block(block) => blocks.push(sort_block(block)),
        }
    }

    attributes.sort_by(|a, b| a.key().cmp(b.key()));
    blocks.sort_by(|a, b| block_key(a).cmp(&block_key(b)));

    attributes
        .into_iter()
        .map(Structure::from)
        .chain(blocks.into_iter().map(Structure::from))
        .collect()
}

fn sort_block(mut block: Block) -> Block {
    block.body = sort_body(block.body);
    block
}

fn block_key(block: &Block) -> (&str, Vec<&str>) {
    (
        block.identifier(),
        block.labels().iter().map(|label| label.as_str()).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorts_attributes_and_blocks() {
        let input = r#"
resource "b" "x" {
  zone = "eu"
  name = "n"
}

resource "a" "y" {
  tag {
    value = "1"
    key = "k"
  }
  enabled = true
}
"#;
        let out = normalize(input);
        let a = out.find("resource \"a\" \"y\"").unwrap();
        let b = out.find("resource \"b\" \"x\"").unwrap();
        assert!(a < b);
        assert!(out.find("enabled").unwrap() < out.find("tag {").unwrap());
        assert!(out.find("key = \"k\"").unwrap() < out.find("value = \"1\"").unwrap());
        assert!(out.find("name = \"n\"").unwrap() < out.find("zone = \"eu\"").unwrap());
    }

    #[test]
    fn test_idempotent() {
        let input = "resource \"x\" \"a\" {\n  b = 1\n  a = [1, 2]\n  c {\n    d = \"e\"\n  }\n}\n";
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_order_independent() {
        let first = "resource \"x\" \"a\" {\n  n = 1\n}\n";
        let second = "data \"y\" \"b\" {\n  m = \"v\"\n}\n";
        assert_eq!(
            normalize(&format!("{}\n{}", first, second)),
            normalize(&format!("{}\n{}", second, first))
        );
        assert!(equivalent(
            &format!("{}\n{}", first, second),
            &format!("{}\n{}", second, first)
        ));
    }

    #[test]
    fn test_blocks_with_same_identifier_ordered_by_labels() {
        let input = "tag \"b\" {}\ntag \"a\" {}\ntag {}\n";
        let out = normalize(input);
        let plain = out.find("tag {").unwrap();
        let a = out.find("tag \"a\"").unwrap();
        let b = out.find("tag \"b\"").unwrap();
        assert!(plain < a && a < b);
    }

    #[test]
    fn test_unparsable_input_returned_unchanged() {
        let input = "resource \"x\" {";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn test_validate() {
        assert!(validate("a = 1\n").is_ok());
        assert!(validate("a = ").is_err());
    }
}
