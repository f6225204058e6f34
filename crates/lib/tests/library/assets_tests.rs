use std::fs;

use stackweave_lib::assets::{AssetSlot, AssetSource, ImageSource, Packaging};
use stackweave_lib::naming::{asset_parameter_id, reference_parameter_name};
use stackweave_lib::template::Primitive;
use tempfile::tempdir;

use super::common::{add_stack, app_with_stack, consumed, consumer, nested_template, passed_parameters, top_template};

fn inline(name: &str, contents: &str) -> AssetSource {
  AssetSource::Inline {
    name: name.to_string(),
    contents: contents.as_bytes().to_vec(),
  }
}

fn asset_parameters(template: &stackweave_lib::template::Template) -> Vec<&str> {
  template
    .parameters
    .keys()
    .map(String::as_str)
    .filter(|name| name.starts_with("AssetParameters"))
    .collect()
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn identical_content_shares_one_parameter_set() {
  let temp = tempdir().unwrap();
  let first = temp.path().join("first.zip");
  let second = temp.path().join("second.zip");
  fs::write(&first, "same bytes").unwrap();
  fs::write(&second, "same bytes").unwrap();

  let (mut app, stack) = app_with_stack("Stack");
  let a = app.add_file_asset(stack, "A", AssetSource::File(first)).unwrap();
  let b = app.add_file_asset(stack, "B", AssetSource::File(second)).unwrap();
  assert_eq!(a.hash, b.hash);
  assert_eq!(app.assets().assets_of(stack).count(), 1);

  let assembly = app.synth().unwrap();
  assert_eq!(asset_parameters(top_template(&assembly, "Stack")).len(), 3);
  assert_eq!(assembly.manifest.artifacts["Stack"].assets.len(), 1);
}

#[test]
fn different_content_gets_its_own_parameters() {
  let (mut app, stack) = app_with_stack("Stack");
  app.add_file_asset(stack, "A", inline("a.txt", "alpha")).unwrap();
  app.add_file_asset(stack, "B", inline("b.txt", "beta")).unwrap();

  let assembly = app.synth().unwrap();
  assert_eq!(asset_parameters(top_template(&assembly, "Stack")).len(), 6);
}

#[test]
fn each_top_level_stack_declares_its_own_parameters() {
  let mut app = stackweave_lib::App::new();
  let s1 = add_stack(&mut app, "S1");
  let s2 = add_stack(&mut app, "S2");
  let a = app.add_file_asset(s1, "Code", inline("code.zip", "shared")).unwrap();
  let b = app.add_file_asset(s2, "Code", inline("code.zip", "shared")).unwrap();
  assert_eq!(a.hash, b.hash);
  assert_ne!(a.stack, b.stack);

  let assembly = app.synth().unwrap();
  let p1 = asset_parameters(top_template(&assembly, "S1"));
  let p2 = asset_parameters(top_template(&assembly, "S2"));
  assert_eq!(p1.len(), 3);
  assert_eq!(p1, p2);
  assert!(assembly.manifest.artifacts["S2"].dependencies.is_empty());
}

#[test]
fn assets_declared_in_nested_stacks_live_on_the_top_level_stack() {
  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let asset = app.add_file_asset(nested, "Code", inline("code.zip", "handler")).unwrap();
  assert_eq!(asset.stack, parent);

  let assembly = app.synth().unwrap();
  let inner = nested_template(&app, &assembly, nested);
  assert!(inner.parameters.is_empty());

  let artifact = &assembly.manifest.artifacts["Parent"];
  assert!(artifact.assets.iter().any(|a| a.source_hash == asset.hash));
}

#[test]
fn parameters_are_described_with_the_asset_hash() {
  let (mut app, stack) = app_with_stack("Stack");
  let asset = app.add_file_asset(stack, "Code", inline("code.zip", "described")).unwrap();

  let assembly = app.synth().unwrap();
  let template = top_template(&assembly, "Stack");
  let bucket = &template.parameters[&asset_parameter_id(&asset.hash.0, "S3Bucket")];
  assert_eq!(bucket.param_type, "String");
  assert_eq!(
    bucket.description.as_deref(),
    Some(AssetSlot::S3Bucket.description(&asset.hash).as_str())
  );
  assert!(bucket.description.as_deref().unwrap().contains(&asset.hash.0));
}

// =============================================================================
// Consumption
// =============================================================================

#[test]
fn top_level_consumer_reads_the_parameter_directly() {
  let (mut app, stack) = app_with_stack("Stack");
  let asset = app.add_file_asset(stack, "Code", inline("code.zip", "direct")).unwrap();
  consumer(&mut app, stack, "Function", asset.bucket_name());

  let assembly = app.synth().unwrap();
  let template = top_template(&assembly, "Stack");
  assert_eq!(
    *consumed(template, "Function"),
    Primitive::reference(asset_parameter_id(&asset.hash.0, "S3Bucket"))
  );
}

#[test]
fn nested_consumer_receives_the_asset_parameter() {
  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let asset = app.add_file_asset(nested, "Code", inline("code.zip", "proxied")).unwrap();
  consumer(&mut app, nested, "Function", asset.bucket_name());

  let assembly = app.synth().unwrap();
  let param = reference_parameter_name(&["Parent", "AssetParameters", asset.hash.0.as_str(), "S3Bucket"], "Ref");

  let outer = top_template(&assembly, "Parent");
  assert_eq!(
    passed_parameters(&app, outer, nested)[&param],
    Primitive::reference(asset_parameter_id(&asset.hash.0, "S3Bucket"))
  );

  let inner = nested_template(&app, &assembly, nested);
  assert_eq!(inner.parameters.len(), 1);
  assert!(inner.parameters.contains_key(&param));
  assert_eq!(*consumed(inner, "Function"), Primitive::reference(param));
}

#[test]
fn asset_parameters_are_proxied_through_every_level() {
  let (mut app, parent) = app_with_stack("Parent");
  let n1 = app.add_nested_stack(parent, "N1").unwrap();
  let n2 = app.add_nested_stack(n1, "N2").unwrap();
  let asset = app.add_file_asset(n2, "Code", inline("code.zip", "deep")).unwrap();
  consumer(&mut app, n2, "Function", asset.bucket_name());

  let assembly = app.synth().unwrap();
  let p1 = reference_parameter_name(&["Parent", "AssetParameters", asset.hash.0.as_str(), "S3Bucket"], "Ref");
  let p2 = reference_parameter_name(&["Parent".to_string(), "N1".to_string(), p1.clone()], "Ref");

  let top = top_template(&assembly, "Parent");
  let t1 = nested_template(&app, &assembly, n1);
  let t2 = nested_template(&app, &assembly, n2);

  assert_eq!(
    passed_parameters(&app, top, n1)[&p1],
    Primitive::reference(asset_parameter_id(&asset.hash.0, "S3Bucket"))
  );
  assert_eq!(passed_parameters(&app, t1, n2)[&p2], Primitive::reference(p1));
  assert_eq!(*consumed(t2, "Function"), Primitive::reference(p2));
}

#[test]
fn container_images_have_a_single_parameter() {
  let temp = tempdir().unwrap();
  fs::write(temp.path().join("Dockerfile"), "FROM public.ecr.aws/lambda/nodejs").unwrap();

  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let image = app
    .add_image_asset(
      nested,
      "Image",
      ImageSource {
        directory: temp.path().to_path_buf(),
        ..Default::default()
      },
    )
    .unwrap();
  consumer(&mut app, nested, "Task", image.image_uri());

  let assembly = app.synth().unwrap();
  let artifact = &assembly.manifest.artifacts["Parent"];
  let metadata = artifact
    .assets
    .iter()
    .find(|a| a.packaging == Packaging::ContainerImage)
    .unwrap();
  assert_eq!(metadata.source_hash, image.hash);
  assert_eq!(metadata.parameters.keys().collect::<Vec<_>>(), vec!["ImageName"]);

  let param = reference_parameter_name(&["Parent", "AssetParameters", image.hash.0.as_str(), "ImageName"], "Ref");
  let inner = nested_template(&app, &assembly, nested);
  assert_eq!(inner.parameters.keys().collect::<Vec<_>>(), vec![&param]);

  let Primitive::Join { separator, parts } = consumed(inner, "Task") else {
    panic!("expected a join");
  };
  assert!(separator.is_empty());
  assert_eq!(parts.first(), Some(&Primitive::reference("AWS::AccountId")));
  assert_eq!(parts.last(), Some(&Primitive::reference(param)));
}

#[test]
fn identical_image_contexts_in_different_directories_are_one_asset() {
  let first = tempdir().unwrap();
  let second = tempdir().unwrap();
  fs::write(first.path().join("Dockerfile"), "FROM scratch").unwrap();
  fs::write(second.path().join("Dockerfile"), "FROM scratch").unwrap();

  let (mut app, stack) = app_with_stack("Stack");
  let a = app
    .add_image_asset(
      stack,
      "A",
      ImageSource {
        directory: first.path().to_path_buf(),
        ..Default::default()
      },
    )
    .unwrap();
  let b = app
    .add_image_asset(
      stack,
      "B",
      ImageSource {
        directory: second.path().to_path_buf(),
        ..Default::default()
      },
    )
    .unwrap();
  assert_eq!(a.hash, b.hash);
  assert_eq!(app.assets().assets_of(stack).count(), 1);

  let assembly = app.synth().unwrap();
  assert_eq!(asset_parameters(top_template(&assembly, "Stack")).len(), 1);
}

#[test]
fn unconsumed_image_in_a_nested_stack_still_gets_its_parameter() {
  let temp = tempdir().unwrap();
  fs::write(temp.path().join("Dockerfile"), "FROM scratch").unwrap();

  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let image = app
    .add_image_asset(
      nested,
      "Image",
      ImageSource {
        directory: temp.path().to_path_buf(),
        ..Default::default()
      },
    )
    .unwrap();

  let assembly = app.synth().unwrap();
  let param = reference_parameter_name(&["Parent", "AssetParameters", image.hash.0.as_str(), "ImageName"], "Ref");
  let inner = nested_template(&app, &assembly, nested);
  assert_eq!(inner.parameters.keys().collect::<Vec<_>>(), vec![&param]);

  let outer = top_template(&assembly, "Parent");
  assert_eq!(
    passed_parameters(&app, outer, nested)[&param],
    Primitive::reference(asset_parameter_id(&image.hash.0, "ImageName"))
  );
}

#[test]
fn unconsumed_file_asset_in_a_nested_stack_adds_no_parameter() {
  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  app.add_file_asset(nested, "Code", inline("code.zip", "idle")).unwrap();

  let assembly = app.synth().unwrap();
  assert!(nested_template(&app, &assembly, nested).parameters.is_empty());
}

#[test]
fn object_key_reads_the_version_key_parameter() {
  let (mut app, stack) = app_with_stack("Stack");
  let asset = app.add_file_asset(stack, "Code", inline("code.zip", "keyed")).unwrap();
  consumer(&mut app, stack, "Function", asset.object_key());

  let assembly = app.synth().unwrap();
  let key = Primitive::reference(asset_parameter_id(&asset.hash.0, "S3VersionKey"));
  let rendered = consumed(top_template(&assembly, "Stack"), "Function").to_json_string().unwrap();
  assert!(rendered.contains(&key.to_json_string().unwrap()));
  assert!(rendered.contains("\"||\""));
}
