use crate::funnel::gate::GateState;

/// Whether a section shows its real content or the call-to-action that
/// stands in for it while its gate is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentVariant {
    Ready,
    Placeholder,
}

/// Supplies the payload for each section. The deck never looks inside it.
pub trait ContentProvider {
    type Payload;

    fn section_count(&self) -> usize;
    fn payload(&self, index: usize, variant: ContentVariant) -> Self::Payload;
}

/// The landing funnel, top to bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunnelSection {
    Hero,
    Progress,
    Quiz,
    Pricing,
    SocialProof,
    Footer,
}

impl FunnelSection {
    pub const ALL: [FunnelSection; 6] = [
        FunnelSection::Hero,
        FunnelSection::Progress,
        FunnelSection::Quiz,
        FunnelSection::Pricing,
        FunnelSection::SocialProof,
        FunnelSection::Footer,
    ];

    pub fn index(self) -> usize {
        match self {
            FunnelSection::Hero => 0,
            FunnelSection::Progress => 1,
            FunnelSection::Quiz => 2,
            FunnelSection::Pricing => 3,
            FunnelSection::SocialProof => 4,
            FunnelSection::Footer => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn key(self) -> &'static str {
        match self {
            FunnelSection::Hero => "hero",
            FunnelSection::Progress => "progress",
            FunnelSection::Quiz => "quiz",
            FunnelSection::Pricing => "pricing",
            FunnelSection::SocialProof => "social",
            FunnelSection::Footer => "footer",
        }
    }

    pub fn variant(self, gates: GateState) -> ContentVariant {
        let open = match self {
            FunnelSection::Quiz => gates.quiz_unlocked,
            FunnelSection::Pricing => gates.pricing_unlocked,
            _ => true,
        };
        if open {
            ContentVariant::Ready
        } else {
            ContentVariant::Placeholder
        }
    }
}
