use foundation::handles::Handle;

/// Handle of a feature currently drawn on the map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub Handle);

impl FeatureId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "feature#{}", self.0)
    }
}
