use glam::Mat4;

/// A drawable object as seen by the render-object callbacks.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub name: String,
    /// Name of the material in the material library.
    pub material: String,
    pub world_transform: Mat4,
}

impl Renderable {
    #[must_use]
    pub fn new(name: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            material: material.into(),
            world_transform: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, world_transform: Mat4) -> Self {
        self.world_transform = world_transform;
        self
    }
}
