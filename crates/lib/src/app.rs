//! The application context.
//!
//! An [`App`] is created once per application and threaded explicitly
//! through build and synthesis. It owns the construct tree, the asset
//! registry, and the bundler used to hash asset content.

use tracing::{debug, info};

use crate::assets::{AssetRegistry, AssetSource, Bundler, FileAsset, ImageAsset, ImageSource, LocalBundler};
use crate::construct::{
  AssetNode, Environment, NodeId, NodeKind, OutputSpec, ResourceConstruct, StackKind, StackProps, Tree, TreeError,
  is_valid_stack_name,
};
use crate::naming::unique_id;
use crate::placeholder::Placeholder;
use crate::synth::{CloudAssembly, Prepared, SynthError, prepare, synthesize};
use crate::template::ParameterDef;
use crate::util::hash::ContentHash;

#[derive(Debug)]
pub struct App {
  tree: Tree,
  assets: AssetRegistry,
  bundler: Box<dyn Bundler>,
}

impl Default for App {
  fn default() -> Self {
    Self::new()
  }
}

impl App {
  pub fn new() -> Self {
    Self::with_bundler(LocalBundler)
  }

  /// Use a custom bundling layer to hash asset content.
  pub fn with_bundler(bundler: impl Bundler + 'static) -> Self {
    Self {
      tree: Tree::new(),
      assets: AssetRegistry::new(),
      bundler: Box::new(bundler),
    }
  }

  pub fn root(&self) -> NodeId {
    self.tree.root()
  }

  pub fn tree(&self) -> &Tree {
    &self.tree
  }

  pub fn assets(&self) -> &AssetRegistry {
    &self.assets
  }

  pub fn bundler(&self) -> &dyn Bundler {
    self.bundler.as_ref()
  }

  // ==========================================================================
  // Build
  // ==========================================================================

  pub fn add_group(&mut self, scope: NodeId, id: &str) -> Result<NodeId, TreeError> {
    self.tree.node(scope)?;
    self.tree.add_child(scope, id, NodeKind::Group)
  }

  /// Add an independently deployable stack. Stacks cannot live inside other
  /// stacks; use [`App::add_nested_stack`] for that.
  pub fn add_stack(&mut self, scope: NodeId, id: &str, props: StackProps) -> Result<NodeId, TreeError> {
    self.tree.node(scope)?;
    if let Some(parent) = self.tree.stack_of(scope) {
      return Err(TreeError::StackInsideStack {
        path: join_path(&self.tree.path(scope), id),
        parent: self.tree.path(parent),
      });
    }

    let name = match &props.stack_name {
      Some(name) => name.clone(),
      None if scope == self.root() => id.to_string(),
      None => {
        let mut components = self.tree.path_components(scope);
        components.push(id.to_string());
        unique_id(&components)
      }
    };
    if !is_valid_stack_name(&name) {
      return Err(TreeError::InvalidStackName { name });
    }

    let stack = self.tree.add_child(scope, id, NodeKind::Stack(StackKind::TopLevel(props)))?;
    debug!(stack = %name, path = %self.tree.path(stack), "added stack");
    Ok(stack)
  }

  /// Add a stack embedded in the nearest stack enclosing `scope`.
  pub fn add_nested_stack(&mut self, scope: NodeId, id: &str) -> Result<NodeId, TreeError> {
    self.tree.node(scope)?;
    if scope == self.root() {
      return Err(TreeError::NestedStackAtRoot { id: id.to_string() });
    }
    if self.tree.stack_of(scope).is_none() {
      return Err(TreeError::NestedStackWithoutParent {
        path: join_path(&self.tree.path(scope), id),
      });
    }

    let stack = self.tree.add_child(scope, id, NodeKind::Stack(StackKind::Nested))?;
    debug!(path = %self.tree.path(stack), "added nested stack");
    Ok(stack)
  }

  pub fn add_resource(
    &mut self,
    scope: NodeId,
    id: &str,
    resource: impl ResourceConstruct + 'static,
  ) -> Result<NodeId, TreeError> {
    self.require_stack(scope, id, "resource")?;
    self.tree.add_child(scope, id, NodeKind::Resource(Box::new(resource)))
  }

  /// Set a property on an existing resource. Intended for the build phase only.
  pub fn set_property(&mut self, resource: NodeId, name: &str, value: impl Into<Placeholder>) -> Result<(), TreeError> {
    let path = self.tree.path(resource);
    match self.tree.node_mut(resource)?.kind_mut() {
      NodeKind::Resource(r) => {
        r.set_property(name.to_string(), value.into());
        Ok(())
      }
      other => Err(TreeError::WrongKind {
        path,
        kind: other.describe(),
        expected: "resource",
      }),
    }
  }

  pub fn add_parameter(&mut self, scope: NodeId, id: &str, parameter: ParameterDef) -> Result<NodeId, TreeError> {
    self.require_stack(scope, id, "parameter")?;
    self.tree.add_child(scope, id, NodeKind::Parameter(parameter))
  }

  pub fn add_output(&mut self, scope: NodeId, id: &str, output: OutputSpec) -> Result<NodeId, TreeError> {
    self.require_stack(scope, id, "output")?;
    self.tree.add_child(scope, id, NodeKind::Output(output))
  }

  /// Register a file, directory, or inline asset.
  ///
  /// The asset's parameters are declared on the top-level stack enclosing
  /// `scope`. Registering identical content twice under one top-level stack
  /// yields handles that share one parameter set.
  pub fn add_file_asset(&mut self, scope: NodeId, id: &str, source: AssetSource) -> Result<FileAsset, TreeError> {
    let (node, stack, hash) = self.add_asset(scope, id, source)?;
    Ok(FileAsset { node, stack, hash })
  }

  pub fn add_image_asset(&mut self, scope: NodeId, id: &str, image: ImageSource) -> Result<ImageAsset, TreeError> {
    let (node, stack, hash) = self.add_asset(scope, id, AssetSource::ContainerImage(image))?;
    Ok(ImageAsset { node, stack, hash })
  }

  fn add_asset(
    &mut self,
    scope: NodeId,
    id: &str,
    source: AssetSource,
  ) -> Result<(NodeId, NodeId, ContentHash), TreeError> {
    let stack = self.require_stack(scope, id, "asset")?;
    let top = self.tree.top_level_of(stack).ok_or(TreeError::UnknownNode(stack))?;

    let hash = self.bundler.content_hash(&source)?;
    let packaging = source.packaging();
    let node = self.tree.add_child(
      scope,
      id,
      NodeKind::Asset(AssetNode {
        hash: hash.clone(),
        packaging,
      }),
    )?;
    self.assets.register(top, hash.clone(), packaging, source.local_path());
    Ok((node, top, hash))
  }

  fn require_stack(&self, scope: NodeId, id: &str, kind: &'static str) -> Result<NodeId, TreeError> {
    self.tree.node(scope)?;
    self.tree.stack_of(scope).ok_or_else(|| TreeError::NoEnclosingStack {
      kind,
      path: join_path(&self.tree.path(scope), id),
    })
  }

  // ==========================================================================
  // Deferred values
  // ==========================================================================

  /// The primary identifier of a resource or parameter.
  pub fn reference(&self, node: NodeId) -> Result<Placeholder, TreeError> {
    match self.tree.node(node)?.kind() {
      NodeKind::Resource(_) | NodeKind::Parameter(_) => Ok(Placeholder::reference(node)),
      other => Err(TreeError::WrongKind {
        path: self.tree.path(node),
        kind: other.describe(),
        expected: "resource or parameter",
      }),
    }
  }

  /// A named attribute of a resource, checked against what the resource exposes.
  pub fn get_att(&self, node: NodeId, attribute: &str) -> Result<Placeholder, TreeError> {
    match self.tree.node(node)?.kind() {
      NodeKind::Resource(resource) if resource.has_attribute(attribute) => Ok(Placeholder::attribute(node, attribute)),
      NodeKind::Resource(_) => Err(TreeError::UnknownAttribute {
        path: self.tree.path(node),
        attribute: attribute.to_string(),
      }),
      other => Err(TreeError::WrongKind {
        path: self.tree.path(node),
        kind: other.describe(),
        expected: "resource",
      }),
    }
  }

  pub fn stack_id(&self, stack: NodeId) -> Result<Placeholder, TreeError> {
    self.require_stack_node(stack)?;
    Ok(Placeholder::stack_id(stack))
  }

  pub fn stack_name(&self, stack: NodeId) -> Result<Placeholder, TreeError> {
    self.require_stack_node(stack)?;
    Ok(Placeholder::stack_name(stack))
  }

  fn require_stack_node(&self, stack: NodeId) -> Result<(), TreeError> {
    let node = self.tree.node(stack)?;
    if node.is_stack() {
      Ok(())
    } else {
      Err(TreeError::WrongKind {
        path: self.tree.path(stack),
        kind: node.kind().describe(),
        expected: "stack",
      })
    }
  }

  /// Handle to a previously registered file asset.
  pub fn file_asset(&self, node: NodeId) -> Result<FileAsset, TreeError> {
    let (stack, asset) = self.asset_node(node)?;
    Ok(FileAsset {
      node,
      stack,
      hash: asset.hash.clone(),
    })
  }

  /// Handle to a previously registered container image asset.
  pub fn image_asset(&self, node: NodeId) -> Result<ImageAsset, TreeError> {
    let (stack, asset) = self.asset_node(node)?;
    Ok(ImageAsset {
      node,
      stack,
      hash: asset.hash.clone(),
    })
  }

  fn asset_node(&self, node: NodeId) -> Result<(NodeId, &AssetNode), TreeError> {
    match self.tree.node(node)?.kind() {
      NodeKind::Asset(asset) => {
        let stack = self.tree.top_level_of(node).ok_or(TreeError::UnknownNode(node))?;
        Ok((stack, asset))
      }
      other => Err(TreeError::WrongKind {
        path: self.tree.path(node),
        kind: other.describe(),
        expected: "asset",
      }),
    }
  }

  pub fn environment(&self, stack: NodeId) -> Result<Environment, TreeError> {
    self.tree.environment(stack)
  }

  // ==========================================================================
  // Synthesis
  // ==========================================================================

  /// Run the prepare phase: discover, classify, and wire every reference,
  /// embed nested stack templates, and check the dependency graph.
  pub fn prepare(&self) -> Result<Prepared, SynthError> {
    prepare(self)
  }

  /// Prepare and render every template. Either the whole application
  /// synthesizes or nothing does.
  pub fn synth(&self) -> Result<CloudAssembly, SynthError> {
    let prepared = self.prepare()?;
    let assembly = synthesize(self, &prepared)?;
    info!(
      stacks = assembly.manifest.artifacts.len(),
      documents = assembly.documents.len(),
      "synthesized application"
    );
    Ok(assembly)
  }
}

fn join_path(scope: &str, id: &str) -> String {
  if scope.is_empty() {
    id.to_string()
  } else {
    format!("{scope}/{id}")
  }
}
