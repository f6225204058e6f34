use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::app::App;
use crate::assets::Packaging;
use crate::construct::{NodeId, NodeKind};
use crate::placeholder::{Placeholder, Pseudo};

use super::DefinitionError;

/// Converts JSON values with embedded reference expressions into deferred values.
pub(crate) struct ExpressionParser<'a> {
  pub app: &'a App,
  pub paths: &'a BTreeMap<String, NodeId>,
  /// Where the expression sits, for error messages.
  pub at: &'a str,
}

impl ExpressionParser<'_> {
  pub fn parse(&self, value: &Value) -> Result<Placeholder, DefinitionError> {
    match value {
      Value::Array(items) => Ok(Placeholder::List(
        items.iter().map(|item| self.parse(item)).collect::<Result<_, _>>()?,
      )),
      Value::Object(map) => self.parse_object(map),
      scalar => Ok(Placeholder::Literal(scalar.clone())),
    }
  }

  fn parse_object(&self, map: &Map<String, Value>) -> Result<Placeholder, DefinitionError> {
    if map.len() == 2
      && let (Some(asset), Some(attribute)) = (map.get("Asset"), map.get("Attribute"))
    {
      return self.asset(asset, attribute);
    }

    if map.len() == 1
      && let Some((key, arg)) = map.iter().next()
    {
      match key.as_str() {
        "Ref" => return self.reference(arg),
        "Fn::GetAtt" => return self.get_att(arg),
        "Fn::Join" => return self.join(arg),
        "Fn::Select" => return self.select(arg),
        "Fn::Split" => return self.split(arg),
        "Pseudo" => return self.pseudo(arg),
        "StackId" => return Ok(self.app.stack_id(self.node(self.string(arg, key)?)?)?),
        "StackName" => return Ok(self.app.stack_name(self.node(self.string(arg, key)?)?)?),
        _ => {}
      }
    }

    let mut object = IndexMap::with_capacity(map.len());
    for (key, value) in map {
      object.insert(key.clone(), self.parse(value)?);
    }
    Ok(Placeholder::Object(object))
  }

  fn reference(&self, arg: &Value) -> Result<Placeholder, DefinitionError> {
    let target = self.string(arg, "Ref")?;
    if let Some(pseudo) = Pseudo::from_name(target) {
      return Ok(Placeholder::Pseudo(pseudo));
    }
    Ok(self.app.reference(self.node(target)?)?)
  }

  /// `["path", "Attr"]` or `"path.Attr"`.
  fn get_att(&self, arg: &Value) -> Result<Placeholder, DefinitionError> {
    let (path, attribute) = match arg {
      Value::Array(items) => match items.as_slice() {
        [Value::String(path), Value::String(attribute)] => (path.as_str(), attribute.as_str()),
        _ => return Err(self.invalid("Fn::GetAtt takes [path, attribute]")),
      },
      Value::String(dotted) => dotted
        .rsplit_once('.')
        .ok_or_else(|| self.invalid("Fn::GetAtt string form is \"path.Attribute\""))?,
      _ => return Err(self.invalid("Fn::GetAtt takes [path, attribute]")),
    };
    Ok(self.app.get_att(self.node(path)?, attribute)?)
  }

  fn join(&self, arg: &Value) -> Result<Placeholder, DefinitionError> {
    let [Value::String(separator), Value::Array(parts)] = self.pair(arg, "Fn::Join")? else {
      return Err(self.invalid("Fn::Join takes [separator, [values]]"));
    };
    let parts = parts.iter().map(|part| self.parse(part)).collect::<Result<_, _>>()?;
    Ok(Placeholder::join(separator.clone(), parts))
  }

  fn select(&self, arg: &Value) -> Result<Placeholder, DefinitionError> {
    let [index, list] = self.pair(arg, "Fn::Select")?;
    let index = index
      .as_u64()
      .and_then(|i| usize::try_from(i).ok())
      .ok_or_else(|| self.invalid("Fn::Select index must be a non-negative integer"))?;
    Ok(Placeholder::select(index, self.parse(list)?))
  }

  fn split(&self, arg: &Value) -> Result<Placeholder, DefinitionError> {
    let [Value::String(separator), source] = self.pair(arg, "Fn::Split")? else {
      return Err(self.invalid("Fn::Split takes [separator, value]"));
    };
    Ok(Placeholder::split(separator.clone(), self.parse(source)?))
  }

  fn pseudo(&self, arg: &Value) -> Result<Placeholder, DefinitionError> {
    let name = self.string(arg, "Pseudo")?;
    Pseudo::from_name(name)
      .map(Placeholder::Pseudo)
      .ok_or_else(|| self.invalid(format!("unknown pseudo parameter '{name}'")))
  }

  fn asset(&self, asset: &Value, attribute: &Value) -> Result<Placeholder, DefinitionError> {
    let node = self.node(self.string(asset, "Asset")?)?;
    let attribute = self.string(attribute, "Attribute")?;
    let packaging = match self.app.tree().node(node)?.kind() {
      NodeKind::Asset(asset) => asset.packaging,
      other => {
        let path = self.app.tree().path(node);
        return Err(self.invalid(format!("'{path}' is a {}, not an asset", other.describe())));
      }
    };

    let value = match (packaging, attribute) {
      (Packaging::File, "bucket") => self.app.file_asset(node)?.bucket_name(),
      (Packaging::File, "key") => self.app.file_asset(node)?.object_key(),
      (Packaging::File, "url") => self.app.file_asset(node)?.http_url(),
      (Packaging::File, "s3Url") => self.app.file_asset(node)?.s3_url(),
      (Packaging::File, "hash") => self.app.file_asset(node)?.artifact_hash(),
      (Packaging::ContainerImage, "image") => self.app.image_asset(node)?.image_uri(),
      (Packaging::ContainerImage, "imageName") => self.app.image_asset(node)?.image_name(),
      (packaging, other) => {
        return Err(self.invalid(format!("{packaging:?} assets have no attribute '{other}'")));
      }
    };
    Ok(value)
  }

  fn node(&self, path: &str) -> Result<NodeId, DefinitionError> {
    self.paths.get(path).copied().ok_or_else(|| DefinitionError::UnknownPath {
      path: path.to_string(),
      at: self.at.to_string(),
    })
  }

  fn string<'v>(&self, value: &'v Value, intrinsic: &str) -> Result<&'v str, DefinitionError> {
    value
      .as_str()
      .ok_or_else(|| self.invalid(format!("{intrinsic} takes a string")))
  }

  fn pair<'v>(&self, value: &'v Value, intrinsic: &str) -> Result<&'v [Value; 2], DefinitionError> {
    value
      .as_array()
      .and_then(|items| <&[Value; 2]>::try_from(items.as_slice()).ok())
      .ok_or_else(|| self.invalid(format!("{intrinsic} takes a two-element array")))
  }

  fn invalid(&self, reason: impl Into<String>) -> DefinitionError {
    DefinitionError::InvalidExpression {
      at: self.at.to_string(),
      reason: reason.into(),
    }
  }
}
