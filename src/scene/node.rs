use glam::Affine3A;

/// A named transform slot in a skeleton or model hierarchy.
///
/// # Ownership
///
/// The tree belongs to the model / mesh system. The animation core only
/// borrows it mutably during pose composition and overwrites
/// `local_matrix` and `global_matrix`; a renderer reads them afterwards.
///
/// # Hierarchy
///
/// Children are owned inline, so a tree is a plain value and traversal order
/// is the order of `children`.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    /// Parent-relative transform written by pose composition.
    pub local_matrix: Affine3A,
    /// `parent.global_matrix * local_matrix`, written by pose composition.
    pub global_matrix: Affine3A,
    pub children: Vec<Node>,
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_matrix: Affine3A::IDENTITY,
            global_matrix: Affine3A::IDENTITY,
            children: Vec::new(),
        }
    }

    /// Builder-style child append.
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first search for the first node called `name`, self included.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }
}
