use crate::error::{parse_error, Result};
use scraper::Selector;
use std::collections::HashMap;

/// Parts of a problem page the parser knows how to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    Title,
    TimeLimit,
    MemoryLimit,
    Statement,
    InputSpec,
    OutputSpec,
    Note,
    SampleContainer,
    SampleInput,
    SampleOutput,
    Tags,
    Rating,
}

impl Region {
    pub const ALL: [Region; 12] = [
        Region::Title,
        Region::TimeLimit,
        Region::MemoryLimit,
        Region::Statement,
        Region::InputSpec,
        Region::OutputSpec,
        Region::Note,
        Region::SampleContainer,
        Region::SampleInput,
        Region::SampleOutput,
        Region::Tags,
        Region::Rating,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Region::Title => "title",
            Region::TimeLimit => "time limit",
            Region::MemoryLimit => "memory limit",
            Region::Statement => "statement",
            Region::InputSpec => "input specification",
            Region::OutputSpec => "output specification",
            Region::Note => "note",
            Region::SampleContainer => "sample container",
            Region::SampleInput => "sample input",
            Region::SampleOutput => "sample output",
            Region::Tags => "tags",
            Region::Rating => "rating",
        }
    }
}

/// A table of css selectors, one per region. Swap in another implementation
/// when the site markup moves.
pub trait SelectorSet: Send + Sync {
    /// Identifies the table in structure reports.
    fn version(&self) -> &str;
    fn selector(&self, region: Region) -> &str;
    /// Classes of statement children that are extracted on their own and
    /// must not leak into the statement text.
    fn structural_classes(&self) -> &[&str];
    /// Classes dropped from section text, like the `Input` caption.
    fn caption_classes(&self) -> &[&str];
}

pub struct CodeforcesSelectors;

impl SelectorSet for CodeforcesSelectors {
    fn version(&self) -> &str {
        "codeforces-2024.1"
    }
    fn selector(&self, region: Region) -> &str {
        match region {
            Region::Title => "div.problem-statement div.header div.title",
            Region::TimeLimit => "div.problem-statement div.header div.time-limit",
            Region::MemoryLimit => "div.problem-statement div.header div.memory-limit",
            Region::Statement => "div.problem-statement",
            Region::InputSpec => "div.problem-statement div.input-specification",
            Region::OutputSpec => "div.problem-statement div.output-specification",
            Region::Note => "div.problem-statement div.note",
            Region::SampleContainer => "div.sample-test",
            Region::SampleInput => "div.input pre",
            Region::SampleOutput => "div.output pre",
            Region::Tags => "span.tag-box",
            Region::Rating => r#"span.tag-box[title="Difficulty"]"#,
        }
    }
    fn structural_classes(&self) -> &[&str] {
        &[
            "header",
            "input-specification",
            "output-specification",
            "sample-tests",
            "note",
        ]
    }
    fn caption_classes(&self) -> &[&str] {
        &["property-title", "section-title", "title"]
    }
}

pub(crate) struct Compiled {
    selectors: HashMap<Region, Selector>,
}

impl Compiled {
    pub(crate) fn new(set: &dyn SelectorSet) -> Result<Self> {
        let mut selectors = HashMap::with_capacity(Region::ALL.len());
        for region in Region::ALL {
            let css = set.selector(region);
            let selector = Selector::parse(css).map_err(|e| {
                parse_error(format!("selector for {} ({}): {:?}", region.name(), css, e))
            })?;
            selectors.insert(region, selector);
        }
        Ok(Self { selectors })
    }
    pub(crate) fn get(&self, region: Region) -> &Selector {
        &self.selectors[&region]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_compiles() {
        let compiled = Compiled::new(&CodeforcesSelectors).unwrap();
        for region in Region::ALL {
            let _ = compiled.get(region);
        }
    }

    struct Broken;
    static DEFAULT: CodeforcesSelectors = CodeforcesSelectors;
    impl SelectorSet for Broken {
        fn version(&self) -> &str {
            "broken"
        }
        fn selector(&self, region: Region) -> &str {
            match region {
                Region::Note => "div[[",
                other => DEFAULT.selector(other),
            }
        }
        fn structural_classes(&self) -> &[&str] {
            &[]
        }
        fn caption_classes(&self) -> &[&str] {
            &[]
        }
    }

    #[test]
    fn bad_selector_names_its_region() {
        let err = Compiled::new(&Broken).err().unwrap();
        assert!(err.to_string().contains("note"));
    }
}
