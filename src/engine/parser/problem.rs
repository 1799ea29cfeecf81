use super::{
    selectors::{CodeforcesSelectors, Compiled, Region, SelectorSet},
    text::{clean_title, collapse_whitespace, element_text, pre_text},
};
use crate::{
    config::ClientConfig,
    error::{Error, Kind, Result},
    judge::{
        problem::{dashboard_path, ContestKind, ProblemRef},
        session::AuthSession,
    },
};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

static RATING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*(\d+)$").expect("invalid rating regex"));
static DASHBOARD_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.problems tr").expect("invalid dashboard row selector"));
static DASHBOARD_INDEX: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.id a").expect("invalid dashboard index selector"));
static DASHBOARD_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td:nth-child(2) a").expect("invalid dashboard name selector"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Starts at 1.
    pub index: usize,
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedProblem {
    pub contest_id: u64,
    pub index: String,
    pub name: String,
    pub time_limit: String,
    pub memory_limit: String,
    pub statement: String,
    pub input_spec: String,
    pub output_spec: String,
    pub note: String,
    pub samples: Vec<Sample>,
    pub tags: Vec<String>,
    pub rating: Option<u32>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSummary {
    pub index: String,
    pub name: String,
}

/// Result of a successful structure check: how many nodes each region matched
/// on the reference page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureReport {
    pub version: String,
    pub url: String,
    pub matches: Vec<(Region, usize)>,
}

pub struct PageParser {
    table: Box<dyn SelectorSet>,
    compiled: Compiled,
    reference: (u64, String),
}

impl PageParser {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_selectors(config, Box::new(CodeforcesSelectors))
    }

    pub fn with_selectors(config: &ClientConfig, table: Box<dyn SelectorSet>) -> Result<Self> {
        Ok(Self {
            compiled: Compiled::new(table.as_ref())?,
            table,
            reference: config.reference_problem.clone(),
        })
    }

    pub fn version(&self) -> &str {
        self.table.version()
    }

    fn first(&self, document: &Html, region: Region, skip: &[&str]) -> String {
        document
            .select(self.compiled.get(region))
            .next()
            .map(|e| element_text(e, skip))
            .unwrap_or_default()
    }

    fn samples(&self, document: &Html) -> Vec<Sample> {
        let input = self.compiled.get(Region::SampleInput);
        let output = self.compiled.get(Region::SampleOutput);
        let pairs_in = |block: ElementRef<'_>| -> Option<(String, String)> {
            let ins: Vec<_> = block.select(input).collect();
            let outs: Vec<_> = block.select(output).collect();
            match (ins.as_slice(), outs.as_slice()) {
                ([i], [o]) => Some((pre_text(*i), pre_text(*o))),
                _ => None,
            }
        };
        let blocks: Vec<_> = document
            .select(self.compiled.get(Region::SampleContainer))
            .collect();
        let paired: Option<Vec<_>> = blocks.iter().map(|b| pairs_in(*b)).collect();
        let pairs = match paired {
            Some(pairs) if !pairs.is_empty() => pairs,
            _ => {
                let ins = document.select(input).map(pre_text);
                let outs = document.select(output).map(pre_text);
                ins.zip(outs).collect()
            }
        };
        pairs
            .into_iter()
            .enumerate()
            .map(|(i, (input, output))| Sample {
                index: i + 1,
                input,
                output,
            })
            .collect()
    }

    fn tags_and_rating(&self, document: &Html) -> (Vec<String>, Option<u32>) {
        let rating_of = |t: &str| {
            RATING_TAG
                .captures(t)
                .and_then(|c| c[1].parse::<u32>().ok())
        };
        let mut tags = Vec::new();
        let mut rating = document
            .select(self.compiled.get(Region::Rating))
            .find_map(|e| rating_of(&collapse_whitespace(&e.text().collect::<String>())));
        for e in document.select(self.compiled.get(Region::Tags)) {
            let tag = collapse_whitespace(&e.text().collect::<String>());
            if tag.is_empty() {
                continue;
            }
            match rating_of(&tag) {
                Some(r) => {
                    rating.get_or_insert(r);
                }
                None if !tags.contains(&tag) => tags.push(tag),
                None => {}
            }
        }
        (tags, rating)
    }

    /// Extracts every field of a problem page. A field whose selector matches
    /// nothing comes back empty.
    pub fn parse_problem_html(&self, html: &str, contest_id: u64, index: &str, url: &str) -> ParsedProblem {
        let document = Html::parse_document(html);
        let captions = self.table.caption_classes();
        let name = document
            .select(self.compiled.get(Region::Title))
            .next()
            .map(|e| clean_title(&collapse_whitespace(&e.text().collect::<String>())))
            .unwrap_or_default();
        let (tags, rating) = self.tags_and_rating(&document);
        ParsedProblem {
            contest_id,
            index: index.to_string(),
            name,
            time_limit: self.first(&document, Region::TimeLimit, captions),
            memory_limit: self.first(&document, Region::MemoryLimit, captions),
            statement: self.first(
                &document,
                Region::Statement,
                self.table.structural_classes(),
            ),
            input_spec: self.first(&document, Region::InputSpec, captions),
            output_spec: self.first(&document, Region::OutputSpec, captions),
            note: self.first(&document, Region::Note, captions),
            samples: self.samples(&document),
            tags,
            rating,
            url: url.to_string(),
        }
    }

    async fn fetch(
        &self,
        session: &AuthSession,
        path: &str,
        contest_id: u64,
        index: &str,
        cancel: &CancellationToken,
    ) -> Result<ParsedProblem> {
        let url = session.url(path)?;
        log::debug!("parsing problem page {}", url);
        let html = session.get_page(path, cancel).await?;
        Ok(self.parse_problem_html(&html, contest_id, index, url.as_str()))
    }

    /// Problem page inside its contest (or gym) namespace.
    pub async fn parse_problem(
        &self,
        session: &AuthSession,
        problem: &ProblemRef,
        cancel: &CancellationToken,
    ) -> Result<ParsedProblem> {
        self.fetch(
            session,
            &problem.problem_path(),
            problem.contest,
            &problem.index,
            cancel,
        )
        .await
    }

    /// Same problem through the problemset archive.
    pub async fn parse_problemset(
        &self,
        session: &AuthSession,
        contest_id: u64,
        index: &str,
        cancel: &CancellationToken,
    ) -> Result<ParsedProblem> {
        let problem = ProblemRef::new(ContestKind::Contest, contest_id, index);
        self.fetch(session, &problem.problemset_path(), contest_id, index, cancel)
            .await
    }

    pub async fn contest_problems(
        &self,
        session: &AuthSession,
        kind: ContestKind,
        contest_id: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProblemSummary>> {
        let html = session
            .get_page(&dashboard_path(kind, contest_id), cancel)
            .await?;
        Ok(parse_dashboard(&html))
    }

    /// Counts matches of every region on `html`, failing with the names of
    /// those that matched nothing.
    pub fn check_structure(&self, html: &str, url: &str) -> Result<StructureReport> {
        let document = Html::parse_document(html);
        let matches: Vec<_> = Region::ALL
            .iter()
            .map(|r| (*r, document.select(self.compiled.get(*r)).count()))
            .collect();
        let missing: Vec<String> = matches
            .iter()
            .filter(|(_, n)| *n == 0)
            .map(|(r, _)| r.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::with_description(
                Kind::Structure(missing),
                format!("selector table {} on {}", self.version(), url),
            ));
        }
        Ok(StructureReport {
            version: self.version().to_string(),
            url: url.to_string(),
            matches,
        })
    }

    /// Health probe against the configured reference problem. Independent of
    /// any real parse.
    pub async fn verify_page_structure(
        &self,
        session: &AuthSession,
        cancel: &CancellationToken,
    ) -> Result<StructureReport> {
        let (contest, index) = &self.reference;
        let problem = ProblemRef::new(ContestKind::guess(*contest), *contest, index.as_str());
        let path = problem.problem_path();
        let url: Url = session.url(&path)?;
        let html = session.get_page(&path, cancel).await?;
        self.check_structure(&html, url.as_str())
    }
}

/// Index and name of each problem on a contest dashboard.
pub fn parse_dashboard(html: &str) -> Vec<ProblemSummary> {
    let document = Html::parse_document(html);
    document
        .select(&DASHBOARD_ROW)
        .filter_map(|row| {
            let index = row.select(&DASHBOARD_INDEX).next()?;
            let name = row.select(&DASHBOARD_NAME).next()?;
            Some(ProblemSummary {
                index: collapse_whitespace(&index.text().collect::<String>()),
                name: collapse_whitespace(&name.text().collect::<String>()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PageParser {
        PageParser::new(&ClientConfig::default()).unwrap()
    }

    #[test]
    fn flat_samples_take_the_shorter_side() {
        let html = r#"<div class="sample-test">
            <div class="input"><pre>1</pre></div><div class="output"><pre>a</pre></div>
            <div class="input"><pre>2</pre></div><div class="output"><pre>b</pre></div>
            <div class="input"><pre>3</pre></div>
        </div>"#;
        let p = parser().parse_problem_html(html, 1, "A", "");
        assert_eq!(p.samples.len(), 2);
        assert_eq!(p.samples[1], Sample { index: 2, input: "2".into(), output: "b".into() });
    }

    #[test]
    fn paired_blocks_keep_document_order() {
        let html = r#"<div class="sample-tests">
            <div class="sample-test"><div class="input"><pre>x</pre></div><div class="output"><pre>1</pre></div></div>
            <div class="sample-test"><div class="input"><pre>y</pre></div><div class="output"><pre>2</pre></div></div>
            <div class="sample-test"><div class="input"><pre>z</pre></div><div class="output"><pre>3</pre></div></div>
        </div>"#;
        let p = parser().parse_problem_html(html, 1, "A", "");
        let got: Vec<_> = p.samples.iter().map(|s| (s.index, s.input.as_str(), s.output.as_str())).collect();
        assert_eq!(got, vec![(1, "x", "1"), (2, "y", "2"), (3, "z", "3")]);
    }

    #[test]
    fn missing_fields_degrade_to_empty() {
        let p = parser().parse_problem_html("<html><body></body></html>", 4, "A", "u");
        assert_eq!(p.name, "");
        assert_eq!(p.statement, "");
        assert!(p.samples.is_empty());
        assert_eq!(p.rating, None);
        assert_eq!(p.url, "u");
    }

    #[test]
    fn rating_pseudo_tag() {
        let html = r#"<span class="tag-box">math</span><span class="tag-box"> *1200 </span><span class="tag-box">math</span>"#;
        let p = parser().parse_problem_html(html, 1, "A", "");
        assert_eq!(p.tags, vec!["math".to_string()]);
        assert_eq!(p.rating, Some(1200));
    }

    #[test]
    fn dashboard_rows() {
        let html = r#"<table class="problems">
            <tr><th>#</th><th>Name</th></tr>
            <tr><td class="id"><a href="/contest/4/problem/A"> A </a></td><td><div><a href="/contest/4/problem/A">Watermelon</a></div></td></tr>
            <tr><td class="id"><a href="/contest/4/problem/B">B</a></td><td><div><a href="/contest/4/problem/B">Before an Exam</a></div></td></tr>
        </table>"#;
        let rows = parse_dashboard(html);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ProblemSummary { index: "A".into(), name: "Watermelon".into() });
        assert_eq!(rows[1].name, "Before an Exam");
    }
}
