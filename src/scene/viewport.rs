use crate::resources::DEFAULT_MATERIAL_SCHEME;

/// Render target region; its material scheme selects the techniques drawn.
#[derive(Debug, Clone)]
pub struct Viewport {
    pub name: String,
    pub material_scheme: String,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            material_scheme: DEFAULT_MATERIAL_SCHEME.to_owned(),
            width,
            height,
        }
    }

    #[must_use]
    pub fn with_material_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.material_scheme = scheme.into();
        self
    }
}
