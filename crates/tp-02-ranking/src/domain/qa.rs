//! Question-and-answer sort for comment trees.
//!
//! A comment is a question; replies from the link's author are answers.
//! The rank is the question's confidence plus the best answer's, and a
//! fifth of `log10` of their combined text length. Only the highest
//! confidence answer counts; the first one wins a tie.

use super::confidence::confidence;

/// Divisor applied to the length bonus.
pub const QA_LENGTH_DIVISOR: f64 = 5.0;

/// Vote counts and text length of one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QaPost {
    pub ups: u64,
    pub downs: u64,
    pub body_len: usize,
}

/// Rank from already-computed confidences. An absent answer scores zero
/// with length one.
#[must_use]
pub fn qa_from_scores(question_score: f64, question_len: usize, answer: Option<(f64, usize)>) -> f64 {
    let (answer_score, answer_len) = answer.unwrap_or((0.0, 1));
    // Both texts empty would put log10 at minus infinity.
    let length = question_len.saturating_add(answer_len).max(1) as f64;
    question_score + answer_score + length.log10() / QA_LENGTH_DIVISOR
}

/// Rank of `question` given its candidate `answers`.
#[must_use]
pub fn qa(question: QaPost, answers: &[QaPost]) -> f64 {
    let mut best: Option<(f64, usize)> = None;
    for answer in answers {
        let score = confidence(answer.ups, answer.downs);
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, answer.body_len));
        }
    }
    qa_from_scores(confidence(question.ups, question.downs), question.body_len, best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(ups: u64, downs: u64, body_len: usize) -> QaPost {
        QaPost { ups, downs, body_len }
    }

    #[test]
    fn test_unanswered_question() {
        let q = post(10, 2, 99);
        assert_eq!(qa(q, &[]), confidence(10, 2) + 2.0 / QA_LENGTH_DIVISOR);
    }

    #[test]
    fn test_best_answer_by_confidence() {
        let q = post(1, 0, 9);
        let weak = post(1, 1, 1_000_000);
        let strong = post(20, 0, 1);
        let expected = confidence(1, 0) + confidence(20, 0) + 1.0 / QA_LENGTH_DIVISOR;
        assert_eq!(qa(q, &[weak, strong]), expected);
    }

    #[test]
    fn test_tied_answers_keep_the_first() {
        let q = post(0, 0, 0);
        let first = post(5, 0, 10);
        let second = post(5, 0, 999);
        assert_eq!(qa(q, &[first, second]), confidence(5, 0) + 1.0 / QA_LENGTH_DIVISOR);
    }

    #[test]
    fn test_empty_texts_stay_finite() {
        assert_eq!(qa_from_scores(0.0, 0, Some((0.0, 0))), 0.0);
        assert!(qa(post(0, 0, 0), &[post(0, 0, 0)]).is_finite());
    }

    #[test]
    fn test_answer_lifts_question() {
        let q = post(3, 0, 50);
        assert!(qa(q, &[post(4, 0, 50)]) > qa(q, &[]));
    }
}
