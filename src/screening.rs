//! PCOD/PCOS symptom questionnaire. A preliminary count of yes answers,
//! never a diagnosis.

use serde::{Deserialize, Serialize};

pub const DISCLAIMER: &str = "This is a preliminary screening tool, NOT a medical diagnosis. \
Please consult a healthcare professional for proper evaluation and diagnosis.";

pub const QUESTIONS: [&str; 6] = [
    "Do you have irregular, delayed, or missed menstrual periods?",
    "Do you notice excessive hair growth on your face, chest, abdomen, or back?",
    "Do you experience frequent acne or very oily skin?",
    "Do you find it difficult to lose weight or gain weight easily?",
    "Do you experience hair thinning or hair loss on your scalp?",
    "Have you ever been diagnosed with hormonal imbalance or ovarian cysts?",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScreeningError {
    #[error("question {0} does not exist")]
    UnknownQuestion(usize),
    #[error("{answered} of {total} questions answered")]
    Incomplete { answered: usize, total: usize },
    #[error("expected {expected} answers, got {got}")]
    WrongAnswerCount { expected: usize, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indication {
    Low,
    Moderate,
    High,
}

impl Indication {
    fn from_yes_count(yes: usize) -> Self {
        match yes {
            n if n >= 4 => Indication::High,
            n if n >= 2 => Indication::Moderate,
            _ => Indication::Low,
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Indication::High => "Your responses suggest you may be experiencing several symptoms commonly associated with PCOS/PCOD. We strongly recommend consulting a gynecologist for proper evaluation, testing, and personalized guidance.",
            Indication::Moderate => "You're showing some symptoms that could be related to hormonal changes. Consider scheduling a check-up with a healthcare provider to discuss your concerns and get proper assessment.",
            Indication::Low => "Based on your responses, you're showing minimal symptoms. Continue maintaining a healthy lifestyle and regular health check-ups. Stay aware of any changes in your menstrual cycle.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub yes_count: usize,
    pub total: usize,
    pub indication: Indication,
}

#[derive(Debug, Clone, Default)]
pub struct Screening {
    answers: [Option<bool>; QUESTIONS.len()],
}

impl Screening {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill every answer at once, in question order.
    pub fn from_answers(answers: &[bool]) -> Result<Self, ScreeningError> {
        if answers.len() != QUESTIONS.len() {
            return Err(ScreeningError::WrongAnswerCount {
                expected: QUESTIONS.len(),
                got: answers.len(),
            });
        }
        let mut screening = Self::new();
        for (index, answer) in answers.iter().enumerate() {
            screening.answer(index, *answer)?;
        }
        Ok(screening)
    }

    /// Record or change the answer to question `index` (0-based).
    pub fn answer(&mut self, index: usize, yes: bool) -> Result<(), ScreeningError> {
        let slot = self
            .answers
            .get_mut(index)
            .ok_or(ScreeningError::UnknownQuestion(index))?;
        *slot = Some(yes);
        Ok(())
    }

    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.answered() == QUESTIONS.len()
    }

    pub fn reset(&mut self) {
        self.answers = Default::default();
    }

    pub fn result(&self) -> Result<ScreeningResult, ScreeningError> {
        if !self.is_complete() {
            return Err(ScreeningError::Incomplete {
                answered: self.answered(),
                total: QUESTIONS.len(),
            });
        }
        let yes_count = self.answers.iter().filter(|a| **a == Some(true)).count();
        Ok(ScreeningResult {
            yes_count,
            total: QUESTIONS.len(),
            indication: Indication::from_yes_count(yes_count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_screening_has_no_result() {
        let mut s = Screening::new();
        s.answer(0, true).unwrap();
        s.answer(3, false).unwrap();

        assert_eq!(
            s.result(),
            Err(ScreeningError::Incomplete {
                answered: 2,
                total: 6
            })
        );
    }

    #[test]
    fn indication_thresholds() {
        let cases = [
            ([false, false, false, false, false, false], Indication::Low),
            ([true, false, false, false, false, false], Indication::Low),
            ([true, true, false, false, false, false], Indication::Moderate),
            ([true, true, true, false, false, false], Indication::Moderate),
            ([true, true, true, true, false, false], Indication::High),
            ([true; 6], Indication::High),
        ];
        for (answers, expected) in cases {
            let result = Screening::from_answers(&answers).unwrap().result().unwrap();
            assert_eq!(result.indication, expected, "answers: {answers:?}");
        }
    }

    #[test]
    fn answers_can_change_before_submit() {
        let mut s = Screening::from_answers(&[true; 6]).unwrap();
        for i in 0..4 {
            s.answer(i, false).unwrap();
        }
        let result = s.result().unwrap();
        assert_eq!(result.yes_count, 2);
        assert_eq!(result.indication, Indication::Moderate);

        s.reset();
        assert_eq!(s.answered(), 0);
    }

    #[test]
    fn rejects_out_of_range_and_wrong_counts() {
        let mut s = Screening::new();
        assert_eq!(s.answer(6, true), Err(ScreeningError::UnknownQuestion(6)));
        assert!(matches!(
            Screening::from_answers(&[true, false]),
            Err(ScreeningError::WrongAnswerCount { expected: 6, got: 2 })
        ));
    }
}
