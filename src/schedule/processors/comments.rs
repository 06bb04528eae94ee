use async_trait::async_trait;
use anyhow::Result;
use serde_json::{json, Value};

use super::OperationProcessor;
use crate::metadata::{VideoComment, VideoMetadata};

const TOP_COMMENTS: usize = 3;
const MAX_QUESTIONS: usize = 3;

const POSITIVE: &[&str] = &[
    "amazing", "awesome", "best", "brilliant", "clear", "excellent", "fantastic",
    "good", "great", "helpful", "love", "nice", "perfect", "thank", "thanks", "useful",
];

const NEGATIVE: &[&str] = &[
    "bad", "boring", "broken", "confusing", "hate", "misleading", "poor",
    "terrible", "useless", "waste", "worst", "wrong",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Positive,
    Negative,
    Neutral,
}

fn polarity(text: &str) -> Polarity {
    let lower = text.to_lowercase();
    let score: i32 = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            if POSITIVE.contains(&w) {
                1
            } else if NEGATIVE.contains(&w) {
                -1
            } else {
                0
            }
        })
        .sum();

    match score {
        s if s > 0 => Polarity::Positive,
        s if s < 0 => Polarity::Negative,
        _ => Polarity::Neutral,
    }
}

fn sentiment_label(comments: &[VideoComment]) -> String {
    let total = comments.len();
    let positive = comments.iter().filter(|c| polarity(&c.text) == Polarity::Positive).count();
    let negative = comments.iter().filter(|c| polarity(&c.text) == Polarity::Negative).count();

    if total == 0 || (positive == 0 && negative == 0) {
        "Neutral".to_string()
    } else if positive >= negative {
        format!("Positive ({}%)", positive * 100 / total)
    } else {
        format!("Negative ({}%)", negative * 100 / total)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommentsProcessor;

#[async_trait]
impl OperationProcessor for CommentsProcessor {
    async fn process(&self, metadata: &VideoMetadata) -> Result<Value> {
        let comments = &metadata.top_comments;

        let mut ranked: Vec<&VideoComment> = comments.iter().collect();
        ranked.sort_by(|a, b| b.likes.cmp(&a.likes));

        let top_comments: Vec<Value> = ranked
            .iter()
            .take(TOP_COMMENTS)
            .map(|c| json!({ "text": c.text, "likes": c.likes }))
            .collect();

        let common_questions: Vec<&str> = ranked
            .iter()
            .map(|c| c.text.trim())
            .filter(|text| text.contains('?'))
            .take(MAX_QUESTIONS)
            .collect();

        Ok(json!({
            "sentiment": sentiment_label(comments),
            "analyzedComments": comments.len(),
            "topComments": top_comments,
            "commonQuestions": common_questions,
        }))
    }
}
