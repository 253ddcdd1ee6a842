// Shared geometry and material data referenced by scene instances

use std::rc::Rc;

use glam::Vec4;

use crate::obj::MeshData;

/// Surface response used by the lighting shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub shininess: f32,
}

impl Material {
    /// White material with the given specular exponent.
    pub fn with_shininess(shininess: f32) -> Self {
        Self {
            shininess,
            ..Self::default()
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec4::ONE,
            diffuse: Vec4::ONE,
            specular: Vec4::ONE,
            shininess: 0.0,
        }
    }
}

/// Decoded RGBA8 image, shared by every model that uses it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// A single opaque white texel, bound when a model has no texture.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![255; 4],
        }
    }
}

/// Immutable geometry and material loaded at startup.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub mesh: MeshData,
    pub material: Material,
    pub texture: Option<Rc<TextureData>>,
}

/// Index of a model inside a [`ModelRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(usize);

impl ModelId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owns every loaded model; instances refer to entries by [`ModelId`].
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<Model>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    pub fn insert(&mut self, model: Model) -> ModelId {
        self.models.push(model);
        ModelId(self.models.len() - 1)
    }

    pub fn get(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id.0)
    }

    /// Looks a model up by its object name.
    pub fn find(&self, name: &str) -> Option<ModelId> {
        self.models
            .iter()
            .position(|model| model.name == name)
            .map(ModelId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &Model)> {
        self.models
            .iter()
            .enumerate()
            .map(|(index, model)| (ModelId(index), model))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
