//! Canned companion replies, keyed by topic.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    Greeting,
    Period,
    Cramps,
    Mood,
    Fallback,
}

/// Topic rules in match order. The first rule with a contained keyword
/// decides the bucket; anything else falls back.
const TOPIC_RULES: &[(Topic, &[&str])] = &[
    (Topic::Greeting, &["hello", "hi", "hey"]),
    (Topic::Period, &["period", "menstrual"]),
    (Topic::Cramps, &["cramp", "pain", "hurt"]),
    (Topic::Mood, &["mood", "sad", "angry", "emotional"]),
];

const GREETING: &[&str] = &[
    "Hello lovely! 💕 I'm here to support you through your wellness journey. How are you feeling today?",
    "Hi there! 🌸 Welcome to FEMCARE. I'm your caring companion. What can I help you with?",
];

const PERIOD: &[&str] = &[
    "Period symptoms can be tough! Remember to stay hydrated, use a heating pad for cramps, and rest when you need to. You're doing amazing! 🌷",
    "I understand periods can be challenging. Try gentle stretches, warm drinks, and give yourself permission to rest. You've got this! 💕",
];

const CRAMPS: &[&str] = &[
    "Cramps are no fun! Try applying heat to your lower abdomen, gentle yoga poses like child's pose, or a warm bath. You deserve comfort! ✨",
    "For cramps, I recommend: 1) Heat therapy 2) Light exercise 3) Stay hydrated 4) Rest well. You're stronger than you know! 🌸",
];

const MOOD: &[&str] = &[
    "Mood swings are completely normal during your cycle! Be gentle with yourself. Try journaling, talking to someone you trust, or doing something that brings you joy. 💕",
    "It's okay to feel emotional! Your feelings are valid. Consider some self-care: a warm drink, your favorite show, or a short walk. Sending hugs! 💕",
];

const FALLBACK: &[&str] = &[
    "I'm here for you! 💕 While I may not have all the answers, please know that your feelings matter. Is there something specific about your wellness I can help with?",
    "Thank you for sharing with me! 🌸 Remember, you're not alone in this journey. How else can I support you today?",
];

pub const WELCOME: &str = "Hello! 💕 I'm your FEMCARE wellness companion. I'm here to support you with care and understanding. How are you feeling today? 🌸";

const CRISIS_MESSAGE: &str = "💕 I'm really concerned about what you're sharing. You matter so much, and you don't have to go through this alone. Please remember: you are loved, you are important, and there is help available. Please reach out to a trusted adult or call one of these helplines:";

impl Topic {
    pub fn for_message(text: &str) -> Topic {
        let text = text.to_lowercase();
        TOPIC_RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
            .map(|(topic, _)| *topic)
            .unwrap_or(Topic::Fallback)
    }

    pub fn responses(&self) -> &'static [&'static str] {
        match self {
            Topic::Greeting => GREETING,
            Topic::Period => PERIOD,
            Topic::Cramps => CRAMPS,
            Topic::Mood => MOOD,
            Topic::Fallback => FALLBACK,
        }
    }

    /// Pick one reply from this topic's bucket, uniformly.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static str {
        self.responses().choose(rng).copied().unwrap_or(FALLBACK[0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    #[default]
    India,
    Us,
    Uk,
    International,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Helpline {
    pub name: &'static str,
    pub number: &'static str,
}

impl Region {
    pub fn helplines(&self) -> &'static [Helpline] {
        match self {
            Region::India => &[
                Helpline {
                    name: "Tele-MANAS",
                    number: "14416",
                },
                Helpline {
                    name: "KIRAN Mental Health",
                    number: "1800-599-0019",
                },
                Helpline {
                    name: "Emergency",
                    number: "112",
                },
            ],
            Region::Us => &[
                Helpline {
                    name: "988 Suicide & Crisis Lifeline",
                    number: "988",
                },
                Helpline {
                    name: "Emergency",
                    number: "911",
                },
            ],
            Region::Uk => &[
                Helpline {
                    name: "Samaritans",
                    number: "116 123",
                },
                Helpline {
                    name: "Emergency",
                    number: "999",
                },
            ],
            Region::International => &[Helpline {
                name: "Find a local helpline",
                number: "findahelpline.com",
            }],
        }
    }
}

/// The supportive reply sent for every crisis message. Identical whether or
/// not anyone was notified.
pub fn crisis_response(region: Region) -> String {
    let mut text = String::from(CRISIS_MESSAGE);
    for line in region.helplines() {
        text.push_str(&format!("\n  • {}: {}", line.name, line.number));
    }
    text.push_str("\nYou are never alone. 🤗");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn topics_follow_rule_order() {
        assert_eq!(Topic::for_message("Hello there"), Topic::Greeting);
        assert_eq!(Topic::for_message("My PERIOD is late"), Topic::Period);
        assert_eq!(Topic::for_message("bad cramps today"), Topic::Cramps);
        assert_eq!(Topic::for_message("feeling sad"), Topic::Mood);
        assert_eq!(Topic::for_message("what should I eat"), Topic::Fallback);
        // Period is checked before cramps.
        assert_eq!(Topic::for_message("period pain"), Topic::Period);
    }

    #[test]
    fn pick_stays_within_bucket() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let reply = Topic::Mood.pick(&mut rng);
            assert!(MOOD.contains(&reply));
        }
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let a = Topic::Cramps.pick(&mut StdRng::seed_from_u64(42));
        let b = Topic::Cramps.pick(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn every_bucket_has_replies() {
        for topic in [
            Topic::Greeting,
            Topic::Period,
            Topic::Cramps,
            Topic::Mood,
            Topic::Fallback,
        ] {
            assert!(!topic.responses().is_empty());
        }
    }

    #[test]
    fn crisis_response_lists_regional_helplines() {
        let text = crisis_response(Region::India);
        assert!(text.starts_with(CRISIS_MESSAGE));
        assert!(text.contains("14416"));
        assert!(text.contains("1800-599-0019"));

        assert!(crisis_response(Region::Us).contains("988"));
        assert!(crisis_response(Region::Uk).contains("116 123"));
    }
}
