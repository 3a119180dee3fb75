//! Reference list extraction integration tests

mod common;

use citecheck_core::{extract_references, CheckError, DocumentTextSource, PagedText};
use common::fixtures::load_document_fixture;
use proptest::prelude::*;

#[test]
fn test_ieee_fixture() {
    let refs = extract_references(&load_document_fixture("ieee_references.txt")).unwrap();
    let indices: Vec<u32> = refs.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);

    assert_eq!(refs[0].title, "Deep residual learning for image recognition");
    assert_eq!(refs[0].normalized_title, "deep residual learning for image recognition");
    assert_eq!(refs[1].title, "Attention is all you need");
    assert_eq!(
        refs[2].title,
        "BERT: Pre-training of deep bidirectional transformers for language understanding"
    );
    assert_eq!(refs[3].title, "深度残差学习用于图像识别");
    assert_eq!(refs[4].title, "Language models are few-shot learners");
}

#[test]
fn test_wrapped_lines_are_joined_into_one_entry() {
    let refs = extract_references(&load_document_fixture("ieee_references.txt")).unwrap();
    assert!(refs[1].raw_text.contains("Advances in Neural Information Processing Systems"));
    assert!(!refs[1].raw_text.contains('\n'));
    assert!(!refs[1].raw_text.starts_with("[2]"));
}

#[test]
fn test_paged_text_feeds_the_extractor() {
    let doc = PagedText::from_text(&load_document_fixture("paged_dotted.txt"));
    let refs = extract_references(&doc.get_reference_list_text()).unwrap();
    assert_eq!(refs.len(), 3);
    assert_eq!(
        refs[0].title,
        "Momentum contrast for unsupervised visual representation learning"
    );
    assert_eq!(refs[2].title, "Bootstrap your own latent");
    assert!(!doc.get_body_text().contains("Bibliography"));
}

#[test]
fn test_prose_is_unparsable() {
    let err = extract_references("These are notes.\nNot a list.\n\nStill not a list.").unwrap_err();
    assert_eq!(err, CheckError::UnparsableReferenceList { lines: 3 });
    assert!(err.is_fatal());
}

fn entry(i: u32, bracket: bool) -> String {
    let prefix = if bracket {
        format!("[{}]", i)
    } else {
        format!("{}.", i)
    };
    format!("{} A. Author, \"Paper title number {}\", Venue, 2020.", prefix, i)
}

proptest! {
    #[test]
    fn prop_every_entry_is_found_in_order(count in 1u32..40, bracket in any::<bool>()) {
        let text: Vec<String> = (1..=count).map(|i| entry(i, bracket)).collect();
        let refs = extract_references(&text.join("\n")).unwrap();
        let indices: Vec<u32> = refs.iter().map(|r| r.index).collect();
        prop_assert_eq!(indices, (1..=count).collect::<Vec<_>>());
        for reference in &refs {
            prop_assert_eq!(
                &reference.title,
                &format!("Paper title number {}", reference.index)
            );
        }
    }

    #[test]
    fn prop_extractor_never_panics(text in "\\PC{0,300}") {
        if let Ok(refs) = extract_references(&text) {
            for pair in refs.windows(2) {
                prop_assert!(pair[0].index < pair[1].index);
            }
        }
    }
}
