// Scene graph for the room and the robot

use glam::Mat4;

use crate::camera::Camera;
use crate::light::Light;
use crate::math::Transform;
use crate::matrix_stack::MatrixStack;
use crate::model::ModelId;

/// Draws a single instance. Implemented by the GPU renderer and by test recorders.
pub trait RenderBackend {
    fn draw(&mut self, model: ModelId, world: Mat4, camera: &Camera, light: &Light);
}

/// A placement of a shared model with its own local transform.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    pub model: ModelId,
    pub transform: Transform,
}

impl ModelInstance {
    /// Creates an instance with an identity transform.
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            transform: Transform::identity(),
        }
    }

    pub fn with_transform(model: ModelId, transform: Transform) -> Self {
        Self { model, transform }
    }
}

/// A node owning one instance and its named children.
///
/// Children keep insertion order, which is also the traversal order.
#[derive(Debug, Clone)]
pub struct SceneNode {
    instance: ModelInstance,
    children: Vec<(String, SceneNode)>,
}

impl SceneNode {
    /// Creates a leaf node.
    pub fn new(instance: ModelInstance) -> Self {
        Self {
            instance,
            children: Vec::new(),
        }
    }

    /// Builder form of [`SceneNode::add_child`].
    pub fn with_child(mut self, name: impl Into<String>, child: SceneNode) -> Self {
        self.add_child(name, child);
        self
    }

    /// Attaches a child under `name`.
    ///
    /// # Panics
    /// Panics if a child with the same name already exists.
    pub fn add_child(&mut self, name: impl Into<String>, child: SceneNode) {
        let name = name.into();
        assert!(
            self.child(&name).is_none(),
            "duplicate child node '{name}'"
        );
        self.children.push((name, child));
    }

    pub fn instance(&self) -> &ModelInstance {
        &self.instance
    }

    pub fn transform(&self) -> &Transform {
        &self.instance.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.instance.transform
    }

    /// Gets an immutable reference to a direct child by name.
    pub fn child(&self, name: &str) -> Option<&SceneNode> {
        self.children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, node)| node)
    }

    /// Gets a mutable reference to a direct child by name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.children
            .iter_mut()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, node)| node)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &SceneNode)> {
        self.children
            .iter()
            .map(|(name, node)| (name.as_str(), node))
    }

    /// Follows a path of child names starting below this node.
    pub fn descendant_mut(&mut self, path: &[&str]) -> Option<&mut SceneNode> {
        path.iter()
            .try_fold(self, |node, name| node.child_mut(name))
    }

    /// Draws this subtree: children first, then this node.
    ///
    /// The node's local matrix stays on `stack` while its children are drawn,
    /// and the stack is back at its entry depth on return.
    ///
    /// # Panics
    /// Panics if a child leaves the stack unbalanced.
    pub fn render_recursive(
        &self,
        stack: &mut MatrixStack,
        camera: &Camera,
        light: &Light,
        backend: &mut dyn RenderBackend,
    ) {
        let entry_depth = stack.depth();
        stack.push(self.instance.transform.matrix());

        for (_, child) in &self.children {
            child.render_recursive(stack, camera, light, backend);
        }

        assert_eq!(
            stack.depth(),
            entry_depth + 1,
            "child traversal left the matrix stack unbalanced"
        );
        backend.draw(self.instance.model, stack.accumulate(), camera, light);

        stack.pop();
    }
}

/// Represents the entire scene: an ordered forest of named roots.
#[derive(Debug, Default)]
pub struct Scene {
    roots: Vec<(String, SceneNode)>,
}

impl Scene {
    /// Creates a new, empty scene.
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    /// Adds a root node to the scene.
    ///
    /// # Panics
    /// Panics if a root with the same name already exists.
    pub fn add_root(&mut self, name: impl Into<String>, node: SceneNode) {
        let name = name.into();
        assert!(self.root(&name).is_none(), "duplicate root node '{name}'");
        self.roots.push((name, node));
    }

    /// Gets an immutable reference to a root by name.
    pub fn root(&self, name: &str) -> Option<&SceneNode> {
        self.roots
            .iter()
            .find(|(root_name, _)| root_name == name)
            .map(|(_, node)| node)
    }

    /// Gets a mutable reference to a root by name.
    pub fn root_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.roots
            .iter_mut()
            .find(|(root_name, _)| root_name == name)
            .map(|(_, node)| node)
    }

    /// Resolves `root/child/...` given as a slice of names.
    pub fn node_mut(&mut self, path: &[&str]) -> Option<&mut SceneNode> {
        let (root, rest) = path.split_first()?;
        self.root_mut(root)?.descendant_mut(rest)
    }

    pub fn roots(&self) -> impl Iterator<Item = (&str, &SceneNode)> {
        self.roots.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Draws every root in insertion order with a fresh matrix stack.
    pub fn render(&self, camera: &Camera, light: &Light, backend: &mut dyn RenderBackend) {
        let mut stack = MatrixStack::new();
        for (_, root) in &self.roots {
            root.render_recursive(&mut stack, camera, light, backend);
        }
        assert!(stack.is_empty(), "matrix stack not empty after traversal");
    }
}
