pub mod analysis;
pub mod page;
pub mod publisher;

pub use analysis::{
    AnalysisMethod, AnalysisResult, BehavioralTriggers, Counts, CulturalAdaptations,
    EmotionalAppeals, Examples, HabitFormation, MotivationFramework,
};
pub use page::{ContentSource, PageContent, PageMetadata};
pub use publisher::Publisher;
