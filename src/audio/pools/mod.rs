//! Voice pools: fixed-capacity, steal-oldest-on-overflow bookkeeping for the
//! one-shot impact and bubble sounds (spec.md §4.3, §4.4).

pub mod bubble;
pub mod impact;
pub mod voice_pool;

pub use bubble::{spawn_bubble_voice, BubbleVoice, BubbleVoicePool};
pub use impact::{spawn_impact_voice, ImpactVoice, ImpactVoicePool};
pub use voice_pool::VoicePool;
