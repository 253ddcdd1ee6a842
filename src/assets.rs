// Loading of geometry files and textures from the asset directory

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::Config;
use crate::error::AssetError;
use crate::model::{Material, Model, ModelRegistry, TextureData};
use crate::obj::{self, MeshData};
use crate::robot::{ROBOT_MODELS, ROOM_PARTS};

pub const ROOM_FILE: &str = "RoomModel.obj";
pub const ROBOT_FILE: &str = "RobotModel.obj";

const FLOOR_SHININESS: f32 = 40.0;
const WALL_SHININESS: f32 = 20.0;
const ROBOT_SHININESS: f32 = 120.0;

fn room_material(name: &str) -> Material {
    match name {
        "Ceiling" | "Floor" => Material::with_shininess(FLOOR_SHININESS),
        _ => Material::with_shininess(WALL_SHININESS),
    }
}

/// Reads and parses one geometry file.
pub fn load_obj(path: &Path) -> Result<BTreeMap<String, MeshData>, AssetError> {
    let source = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    obj::parse(&source).map_err(|source| AssetError::Obj {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes an image file into RGBA8, flipped so that v = 0 is the bottom row.
pub fn load_texture(path: &Path) -> Result<TextureData, AssetError> {
    let image = image::open(path).map_err(|source| AssetError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rgba = image.to_rgba8();
    image::imageops::flip_vertical_in_place(&mut rgba);
    Ok(TextureData {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}

/// Loads the textures named in the config, decoding each file once.
struct TextureCache<'a> {
    asset_dir: &'a Path,
    assignments: &'a BTreeMap<String, PathBuf>,
    loaded: HashMap<PathBuf, Rc<TextureData>>,
}

impl TextureCache<'_> {
    fn for_model(&mut self, name: &str) -> Result<Option<Rc<TextureData>>, AssetError> {
        let Some(file) = self.assignments.get(name) else {
            return Ok(None);
        };
        let path = self.asset_dir.join(file);
        if let Some(texture) = self.loaded.get(&path) {
            return Ok(Some(Rc::clone(texture)));
        }
        log::debug!("loading texture {}", path.display());
        let texture = Rc::new(load_texture(&path)?);
        self.loaded.insert(path, Rc::clone(&texture));
        Ok(Some(texture))
    }
}

fn take_object(
    meshes: &mut BTreeMap<String, MeshData>,
    name: &str,
    path: &Path,
) -> Result<MeshData, AssetError> {
    meshes.remove(name).ok_or_else(|| AssetError::MissingObject {
        name: name.to_string(),
        path: path.to_path_buf(),
    })
}

/// Loads the room and robot geometry named by the scene into a registry.
pub fn load_models(config: &Config) -> Result<ModelRegistry, AssetError> {
    let asset_dir = config.asset_dir.as_path();
    let mut textures = TextureCache {
        asset_dir,
        assignments: &config.textures,
        loaded: HashMap::new(),
    };
    let mut registry = ModelRegistry::new();

    let room_path = asset_dir.join(ROOM_FILE);
    log::info!("loading room geometry from {}", room_path.display());
    let mut room = load_obj(&room_path)?;
    for name in ROOM_PARTS {
        let mesh = take_object(&mut room, name, &room_path)?;
        log::debug!("room part {name}: {} vertices", mesh.vertex_count());
        registry.insert(Model {
            name: name.to_string(),
            mesh,
            material: room_material(name),
            texture: textures.for_model(name)?,
        });
    }

    let robot_path = asset_dir.join(ROBOT_FILE);
    log::info!("loading robot geometry from {}", robot_path.display());
    let mut robot = load_obj(&robot_path)?;
    for name in ROBOT_MODELS {
        let mesh = take_object(&mut robot, name, &robot_path)?;
        log::debug!("robot part {name}: {} vertices", mesh.vertex_count());
        registry.insert(Model {
            name: name.to_string(),
            mesh,
            material: Material::with_shininess(ROBOT_SHININESS),
            texture: textures.for_model(name)?,
        });
    }

    log::info!(
        "loaded {} models, {} textures",
        registry.len(),
        textures.loaded.len()
    );
    Ok(registry)
}
