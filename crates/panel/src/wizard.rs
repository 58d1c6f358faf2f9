//! Setup stages that gate the chat entry point.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    Configuration,
    Knowledgebase,
    Profile,
}

impl WizardStage {
    pub const ALL: [WizardStage; 3] = [Self::Configuration, Self::Knowledgebase, Self::Profile];

    pub fn title(self) -> &'static str {
        match self {
            Self::Configuration => "Configuration",
            Self::Knowledgebase => "Knowledgebase",
            Self::Profile => "Profile",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Configuration => 0,
            Self::Knowledgebase => 1,
            Self::Profile => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WizardProgress {
    completed: [bool; 3],
}

impl WizardProgress {
    pub fn is_complete(&self, stage: WizardStage) -> bool {
        self.completed[stage.index()]
    }

    /// A stage opens once every stage before it is complete.
    pub fn is_enabled(&self, stage: WizardStage) -> bool {
        self.completed[..stage.index()].iter().all(|done| *done)
    }

    /// Marks `stage` complete. Returns `false` if the stage is not open yet.
    pub fn complete(&mut self, stage: WizardStage) -> bool {
        if !self.is_enabled(stage) {
            return false;
        }
        self.completed[stage.index()] = true;
        true
    }

    pub fn completed_count(&self) -> usize {
        self.completed.iter().filter(|done| **done).count()
    }

    pub fn percent(&self) -> u8 {
        (self.completed_count() * 100 / WizardStage::ALL.len()) as u8
    }

    pub fn is_finished(&self) -> bool {
        self.completed_count() == WizardStage::ALL.len()
    }
}
