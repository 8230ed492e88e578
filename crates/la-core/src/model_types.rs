/// The generation flows offered by the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineartMode {
    /// Condition on a Canny edge map extracted from the input.
    Canny,
    /// Condition directly on the input image and trace it.
    Cutout,
}

impl LineartMode {
    /// Name for display in UI
    pub fn name(&self) -> &'static str {
        match self {
            Self::Canny => "Line art",
            Self::Cutout => "Line art (cutout)",
        }
    }

    /// Stable identifier used in job records
    pub fn id(&self) -> &'static str {
        match self {
            Self::Canny => "canny",
            Self::Cutout => "cutout",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Canny => "Redraw clean lines guided by an edge map of the input",
            Self::Cutout => "Trace the input image directly into monochrome line art",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Canny => "✏",
            Self::Cutout => "✂",
        }
    }

    /// ControlNet model the backend conditions generation with.
    pub fn control_model(&self) -> &'static str {
        match self {
            Self::Canny => "control-lora-canny-rank256 [ec2dbbe4]",
            Self::Cutout => "CN-anytest_v4-marged_am_dim256 [49b6c950]",
        }
    }

    pub fn requires_lineart(&self) -> bool {
        matches!(self, Self::Canny)
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().into_iter().find(|m| m.id() == id)
    }

    pub fn all() -> [LineartMode; 2] {
        [Self::Canny, Self::Cutout]
    }
}

impl Default for LineartMode {
    fn default() -> Self {
        Self::Canny
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_ids() {
        assert_eq!(LineartMode::Canny.id(), "canny");
        assert_eq!(LineartMode::Cutout.id(), "cutout");
    }

    #[test]
    fn test_mode_roundtrip_by_id() {
        for mode in LineartMode::all() {
            assert_eq!(LineartMode::from_id(mode.id()), Some(mode));
        }
        assert_eq!(LineartMode::from_id("unknown"), None);
    }

    #[test]
    fn test_only_canny_needs_lineart() {
        assert!(LineartMode::Canny.requires_lineart());
        assert!(!LineartMode::Cutout.requires_lineart());
    }

    #[test]
    fn test_control_models_differ() {
        assert_ne!(LineartMode::Canny.control_model(), LineartMode::Cutout.control_model());
    }
}
