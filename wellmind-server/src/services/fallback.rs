//! Canned, keyword-matched replies used when the completion provider is
//! unconfigured, unreachable, or returns nothing useful.
//!
//! Categories are checked in priority order (highest risk first) with a
//! case-insensitive substring match; the first hit wins.  Messages matching
//! no category get a reply drawn at random from [`DEFAULT_REPLIES`].
//!
//! Every reply names [`SUPPORT_PHONE`]; the emergency reply also names
//! [`EMERGENCY_NUMBER`].  Emergency augmentation in the pipeline relies on
//! detecting these strings.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Support line printed in every reply.
pub const SUPPORT_PHONE: &str = "+254759226354";

/// National emergency number.
pub const EMERGENCY_NUMBER: &str = "999";

/// A keyword category and its reply.
#[derive(Debug)]
pub struct Category {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub reply: &'static str,
}

/// Keyword categories in match priority order.
pub const CATEGORIES: &[Category] = &[
    Category {
        name: "emergency",
        keywords: &["suicide", "kill myself", "end my life", "want to die", "harm myself"],
        reply: "🚨 EMERGENCY: Please call our emergency line immediately at +254759226354 or dial 999. You are not alone, and help is available right now. We care about you.",
    },
    Category {
        name: "anxiety",
        keywords: &["anxious", "anxiety", "panic", "worried", "nervous", "overthinking"],
        reply: "I understand you're feeling anxious. Try this breathing exercise: Inhale for 4 seconds, hold for 4, exhale for 6. Repeat 5 times. For ongoing anxiety support, contact our counselors at +254759226354.",
    },
    Category {
        name: "depression",
        keywords: &["depressed", "sad", "hopeless", "unmotivated", "empty", "worthless"],
        reply: "I hear you're feeling down. Depression is treatable, and you don't have to go through this alone. Please reach out to our team at +254759226354 for professional support.",
    },
    Category {
        name: "stress",
        keywords: &["stress", "overwhelmed", "pressure", "burnout", "stressed"],
        reply: "Stress can feel overwhelming. Try breaking tasks into smaller, manageable steps. For personalized stress management techniques, call our team at +254759226354.",
    },
    Category {
        name: "sleep",
        keywords: &["sleep", "insomnia", "tired", "exhausted", "can't sleep"],
        reply: "Sleep issues can significantly affect mental health. Try establishing a consistent bedtime routine and avoiding screens before bed. For sleep counseling, contact +254759226354.",
    },
    Category {
        name: "relationships",
        keywords: &["relationship", "partner", "breakup", "divorce", "family", "friend"],
        reply: "Relationship challenges can be difficult. Remember that healthy communication is key. For relationship counseling, our team at +254759226354 can help.",
    },
    Category {
        name: "work_school",
        keywords: &["work", "job", "school", "exam", "study", "deadline"],
        reply: "Work/school pressure can be challenging. Try prioritizing tasks and taking regular breaks. For career or academic counseling, call +254759226354.",
    },
];

/// Generic supportive replies for messages that match no category.
pub const DEFAULT_REPLIES: &[&str] = &[
    "I understand you're reaching out. For personalized support, please contact our counselors at +254759226354.",
    "Thank you for sharing. Our team is available 24/7 via WhatsApp at +254759226354 for mental health support.",
    "I appreciate you reaching out. Remember, professional help is available. Call +254759226354 to speak with someone.",
    "Your mental health matters. For immediate support, contact our helpline at +254759226354.",
    "Thank you for trusting me with this. For more personalized help, our counselors are available at +254759226354.",
    "I hear you. It takes courage to reach out. For ongoing support, our team at +254759226354 is here for you.",
    "I understand. Mental health challenges can be difficult. Remember, help is available at +254759226354.",
    "Thank you for sharing your feelings. For professional guidance, please contact our team at +254759226354.",
];

/// First category whose keyword list matches `message`, if any.
pub fn category_of(message: &str) -> Option<&'static Category> {
    let lower = message.to_lowercase();
    CATEGORIES
        .iter()
        .find(|c| c.keywords.iter().any(|k| lower.contains(k)))
}

/// Keyword classifier with an injected random source for the default bucket.
#[derive(Debug)]
pub struct FallbackResponder {
    rng: Mutex<StdRng>,
}

impl Default for FallbackResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackResponder {
    /// Responder seeded from OS entropy.
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Deterministic responder for tests.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    /// Pick the reply for `message`.
    pub fn classify(&self, message: &str) -> &'static str {
        match category_of(message) {
            Some(category) => category.reply,
            None => self.generic(),
        }
    }

    /// A reply from the default pool, chosen uniformly at random.
    pub fn generic(&self) -> &'static str {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        DEFAULT_REPLIES.choose(&mut *rng).copied().unwrap_or(DEFAULT_REPLIES[0])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_reply_names_the_support_line() {
        for c in CATEGORIES {
            assert!(c.reply.contains(SUPPORT_PHONE), "{} reply", c.name);
        }
        for r in DEFAULT_REPLIES {
            assert!(r.contains(SUPPORT_PHONE));
        }
    }

    #[test]
    fn emergency_reply_names_emergency_number() {
        let responder = FallbackResponder::seeded(1);
        let reply = responder.classify("I want to end my life");
        assert!(reply.starts_with("🚨 EMERGENCY"));
        assert!(reply.contains(EMERGENCY_NUMBER));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(category_of("I am so ANXIOUS").map(|c| c.name), Some("anxiety"));
        assert_eq!(category_of("Can't Sleep at all").map(|c| c.name), Some("sleep"));
    }

    #[test]
    fn highest_risk_category_wins() {
        // "anxious" and "want to die" both match; emergency is checked first.
        assert_eq!(category_of("so anxious I want to die").map(|c| c.name), Some("emergency"));
        // "stressed" contains "stress" but "sad" (depression) outranks it.
        assert_eq!(category_of("sad and stressed").map(|c| c.name), Some("depression"));
        assert_eq!(category_of("exam pressure").map(|c| c.name), Some("stress"));
        assert_eq!(category_of("my exam is tomorrow").map(|c| c.name), Some("work_school"));
    }

    #[test]
    fn category_reply_is_stable() {
        let responder = FallbackResponder::new();
        let first = responder.classify("I feel anxious");
        let second = responder.classify("I feel anxious");
        assert_eq!(first, second);
        assert!(first.contains("breathing exercise"));
    }

    #[test]
    fn unmatched_message_draws_from_default_pool() {
        let responder = FallbackResponder::new();
        for _ in 0..20 {
            let reply = responder.classify("hello there");
            assert!(DEFAULT_REPLIES.contains(&reply));
        }
    }

    #[test]
    fn seeded_responders_agree() {
        let a = FallbackResponder::seeded(42);
        let b = FallbackResponder::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.generic(), b.generic());
        }
    }
}
