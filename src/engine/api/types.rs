use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub contest_id: Option<u64>,
    pub problemset_name: Option<String>,
    pub index: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub points: Option<f64>,
    pub rating: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Problem {
    pub fn key(&self) -> Option<ProblemKey> {
        self.contest_id.map(|contest_id| ProblemKey {
            contest_id,
            index: self.index.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProblemKey {
    pub contest_id: u64,
    pub index: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemStatistics {
    pub contest_id: Option<u64>,
    pub index: String,
    pub solved_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSet {
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub problem_statistics: Vec<ProblemStatistics>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub handle: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub organization: Option<String>,
    #[serde(default)]
    pub contribution: i64,
    pub rank: Option<String>,
    pub rating: Option<i64>,
    pub max_rank: Option<String>,
    pub max_rating: Option<i64>,
    #[serde(default)]
    pub last_online_time_seconds: i64,
    #[serde(default)]
    pub registration_time_seconds: i64,
    #[serde(default)]
    pub friend_of_count: u64,
    pub avatar: Option<String>,
    pub title_photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub handle: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub contest_id: Option<u64>,
    #[serde(default)]
    pub members: Vec<Member>,
    pub participant_type: String,
    pub team_id: Option<u64>,
    pub team_name: Option<String>,
    #[serde(default)]
    pub ghost: bool,
    pub room: Option<u64>,
    pub start_time_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: u64,
    pub contest_id: Option<u64>,
    pub creation_time_seconds: i64,
    #[serde(default)]
    pub relative_time_seconds: i64,
    pub problem: Problem,
    pub author: Party,
    pub programming_language: String,
    pub verdict: Option<String>,
    #[serde(default)]
    pub testset: String,
    #[serde(default)]
    pub passed_test_count: u32,
    #[serde(default)]
    pub time_consumed_millis: u64,
    #[serde(default)]
    pub memory_consumed_bytes: u64,
    pub points: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingChange {
    pub contest_id: u64,
    pub contest_name: String,
    pub handle: String,
    pub rank: u64,
    pub rating_update_time_seconds: i64,
    pub old_rating: i64,
    pub new_rating: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub phase: String,
    #[serde(default)]
    pub frozen: bool,
    pub duration_seconds: i64,
    pub start_time_seconds: Option<i64>,
    pub relative_time_seconds: Option<i64>,
    pub prepared_by: Option<String>,
    pub website_url: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<u32>,
    pub kind_name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub season: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemResult {
    pub points: f64,
    pub penalty: Option<i64>,
    #[serde(default)]
    pub rejected_attempt_count: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub best_submission_time_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RanklistRow {
    pub party: Party,
    pub rank: u64,
    pub points: f64,
    #[serde(default)]
    pub penalty: i64,
    #[serde(default)]
    pub successful_hack_count: u32,
    #[serde(default)]
    pub unsuccessful_hack_count: u32,
    #[serde(default)]
    pub problem_results: Vec<ProblemResult>,
    pub last_submission_time_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Standings {
    pub contest: Contest,
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub rows: Vec<RanklistRow>,
}
