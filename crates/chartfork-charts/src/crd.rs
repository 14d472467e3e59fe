//! Moving CRDs between a main chart and its CRD chart
//!
//! A CRD chart is generated from a template kept in the package and
//! receives the `crds/` of the main chart. The main chart can optionally
//! carry a template that refuses to install until the CRDs are present.

use chartfork_core::Result;
use chartfork_core::filesystem::{copy_dir, copy_file, list_files, path_exists, remove_all};
use chartfork_core::paths::{CHART_CRD_DIR, CHART_TEMPLATES_DIR, CHART_VALIDATE_INSTALL_CRD_FILE};
use chartfork_core::CoreError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

const CRD_KIND: &str = "CustomResourceDefinition";

/// Copy every file of `from` into `to`
///
/// Returns the number of files copied. A missing `from` copies nothing.
pub fn copy_crds(from: &Path, to: &Path) -> Result<usize> {
    let files = list_files(from)?;
    for rel_path in &files {
        copy_file(&from.join(rel_path), &to.join(rel_path))?;
    }
    Ok(files.len())
}

/// Copy the files of `from` that did not ship with `template` into `to`
///
/// The CRD directory of a CRD chart is usually its `templates/`, shared
/// with whatever the template ships. Files identical to the template's
/// copy stay behind; everything else was moved in from the main chart.
pub fn copy_crds_from_chart(from: &Path, to: &Path, template: &Path) -> Result<usize> {
    let mut copied = 0;
    for rel_path in list_files(from)? {
        let source = from.join(&rel_path);
        let shipped = template.join(&rel_path);
        if path_exists(&shipped)? && std::fs::read(&shipped)? == std::fs::read(&source)? {
            debug!("Skipping {}: shipped with the template", rel_path.display());
            continue;
        }
        copy_file(&source, &to.join(&rel_path))?;
        copied += 1;
    }
    Ok(copied)
}

/// Remove the `crds/` directory of a chart
pub fn delete_crds(chart_dir: &Path) -> Result<()> {
    remove_all(&chart_dir.join(CHART_CRD_DIR))
}

/// Whether a YAML stream holds a CustomResourceDefinition
pub fn is_crd_manifest(content: &str) -> bool {
    crd_documents(content).next().is_some()
}

fn crd_documents(content: &str) -> impl Iterator<Item = serde_yaml::Value> + '_ {
    serde_yaml::Deserializer::from_str(content)
        .map_while(|doc| serde_yaml::Value::deserialize(doc).ok())
        .filter(|doc| doc.get("kind").and_then(|k| k.as_str()) == Some(CRD_KIND))
}

/// `group/version/Kind` entries of every CRD found under `dir`, sorted
pub fn crd_api_versions(dir: &Path) -> Result<BTreeSet<String>> {
    let mut versions = BTreeSet::new();

    for rel_path in list_files(dir)? {
        let Ok(content) = std::fs::read_to_string(dir.join(&rel_path)) else {
            continue;
        };
        for crd in crd_documents(&content) {
            let spec = crd.get("spec");
            let group = spec.and_then(|s| s.get("group")).and_then(|g| g.as_str());
            let kind = spec
                .and_then(|s| s.get("names"))
                .and_then(|n| n.get("kind"))
                .and_then(|k| k.as_str());
            let (Some(group), Some(kind)) = (group, kind) else {
                debug!("Skipping CRD without group or kind in {}", rel_path.display());
                continue;
            };

            let mut names: Vec<&str> = spec
                .and_then(|s| s.get("versions"))
                .and_then(|v| v.as_sequence())
                .map(|seq| {
                    seq.iter()
                        .filter_map(|v| v.get("name").and_then(|n| n.as_str()))
                        .collect()
                })
                .unwrap_or_default();
            // apiextensions.k8s.io/v1beta1
            if let Some(version) = spec.and_then(|s| s.get("version")).and_then(|v| v.as_str()) {
                names.push(version);
            }

            for version in names {
                versions.insert(format!("{}/{}/{}", group, version, kind));
            }
        }
    }

    Ok(versions)
}

/// Render the template checking that every listed API version is served
pub fn render_crd_validation(api_versions: &BTreeSet<String>) -> String {
    let mut out = String::from(
        "#{{- if gt (len (lookup \"rbac.authorization.k8s.io/v1\" \"ClusterRole\" \"\" \"\")) 0 -}}\n\
         # {{- $found := dict -}}\n",
    );
    for api_version in api_versions {
        out.push_str(&format!("# {{{{- set $found \"{}\" false -}}}}\n", api_version));
    }
    out.push_str(
        "# {{- range .Capabilities.APIVersions -}}\n\
         # {{- if hasKey $found (toString .) -}}\n\
         # \t{{- set $found (toString .) true -}}\n\
         # {{- end -}}\n\
         # {{- end -}}\n\
         # {{- range $_, $exists := $found -}}\n\
         # {{- if (eq $exists false) -}}\n\
         # \t{{- required \"Required CRDs are missing. Please install the corresponding CRD chart before installing this chart.\" \"\" -}}\n\
         # {{- end -}}\n\
         # {{- end -}}\n\
         #{{- end -}}\n",
    );
    out
}

/// Add the CRD validation template to `chart_dir`, listing the CRDs under `crd_dir`
pub fn add_crd_validation(chart_dir: &Path, crd_dir: &Path) -> Result<()> {
    let api_versions = crd_api_versions(crd_dir)?;
    let target = validation_template_path(chart_dir);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, render_crd_validation(&api_versions))?;
    debug!(
        "Added validation for {} CRD version(s) to {}",
        api_versions.len(),
        target.display()
    );
    Ok(())
}

/// Remove the CRD validation template from `chart_dir`
pub fn remove_crd_validation(chart_dir: &Path) -> Result<()> {
    remove_all(&validation_template_path(chart_dir))
}

fn validation_template_path(chart_dir: &Path) -> std::path::PathBuf {
    chart_dir
        .join(CHART_TEMPLATES_DIR)
        .join(CHART_VALIDATE_INSTALL_CRD_FILE)
}

/// Create a CRD chart at `dest` from `template_dir`, with an empty `crd_directory`
pub fn generate_crd_chart_from_template(template_dir: &Path, dest: &Path, crd_directory: &str) -> Result<()> {
    if !path_exists(template_dir)? {
        let (path, subdirectory) = match (template_dir.parent(), template_dir.file_name()) {
            (Some(parent), Some(name)) => (
                parent.display().to_string(),
                name.to_string_lossy().to_string(),
            ),
            _ => (template_dir.display().to_string(), String::new()),
        };
        return Err(CoreError::SubdirectoryNotFound { path, subdirectory });
    }

    copy_dir(template_dir, dest)?;
    std::fs::create_dir_all(dest.join(crd_directory))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WIDGET_CRD: &str = r#"apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.acme.io
spec:
  group: acme.io
  names:
    kind: Widget
    plural: widgets
  scope: Namespaced
  versions:
    - name: v1
      served: true
      storage: true
    - name: v1alpha1
      served: true
      storage: false
"#;

    const GADGET_CRD: &str = r#"apiVersion: apiextensions.k8s.io/v1beta1
kind: CustomResourceDefinition
metadata:
  name: gadgets.acme.io
spec:
  group: acme.io
  version: v1beta1
  names:
    kind: Gadget
"#;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_is_crd_manifest() {
        assert!(is_crd_manifest(WIDGET_CRD));
        assert!(is_crd_manifest(&format!("kind: ConfigMap\n---\n{}", GADGET_CRD)));
        assert!(!is_crd_manifest("kind: Service\nmetadata:\n  name: widget\n"));
        assert!(!is_crd_manifest("{{- if .Values.enabled }}\nkind: Service\n"));
    }

    #[test]
    fn test_crd_api_versions() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "widget.yaml", WIDGET_CRD);
        write(temp.path(), "nested/gadget.yaml", GADGET_CRD);
        write(temp.path(), "service.yaml", "kind: Service\n");

        let versions: Vec<String> = crd_api_versions(temp.path()).unwrap().into_iter().collect();

        assert_eq!(
            versions,
            vec![
                "acme.io/v1/Widget",
                "acme.io/v1alpha1/Widget",
                "acme.io/v1beta1/Gadget",
            ]
        );
    }

    #[test]
    fn test_render_crd_validation() {
        let versions = BTreeSet::from(["acme.io/v1/Widget".to_string()]);
        let rendered = render_crd_validation(&versions);

        assert!(rendered.starts_with("#{{- if gt (len (lookup"));
        assert!(rendered.contains("# {{- set $found \"acme.io/v1/Widget\" false -}}\n"));
        assert!(rendered.contains("Required CRDs are missing."));
        assert!(rendered.ends_with("#{{- end -}}\n"));
    }

    #[test]
    fn test_copy_crds_from_chart_skips_template_files() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("templates/crd-template/templates");
        write(&template, "_helpers.tpl", "{{- define \"name\" -}}widget{{- end -}}\n");
        write(&template, "gadget.yaml", "kind: ConfigMap\n");
        let from = temp.path().join("crd-chart/templates");
        write(&from, "_helpers.tpl", "{{- define \"name\" -}}widget{{- end -}}\n");
        write(&from, "widget.yaml", WIDGET_CRD);
        write(&from, "README.md", "Widget CRDs\n");
        // Same name as a template file, different content
        write(&from, "gadget.yaml", GADGET_CRD);
        let to = temp.path().join("charts/crds");

        assert_eq!(copy_crds_from_chart(&from, &to, &template).unwrap(), 3);
        assert!(to.join("widget.yaml").exists());
        assert!(to.join("README.md").exists());
        assert_eq!(std::fs::read_to_string(to.join("gadget.yaml")).unwrap(), GADGET_CRD);
        assert!(!to.join("_helpers.tpl").exists());
    }

    #[test]
    fn test_add_and_remove_crd_validation() {
        let temp = TempDir::new().unwrap();
        let chart = temp.path().join("charts");
        let crds = temp.path().join("charts-crd/templates");
        write(&crds, "widget.yaml", WIDGET_CRD);

        add_crd_validation(&chart, &crds).unwrap();
        let template = chart.join("templates/validate-install-crd.yaml");
        assert!(std::fs::read_to_string(&template).unwrap().contains("acme.io/v1/Widget"));

        remove_crd_validation(&chart).unwrap();
        assert!(!template.exists());
        remove_crd_validation(&chart).unwrap();
    }

    #[test]
    fn test_generate_crd_chart_from_template() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("templates/crd-template");
        write(&template, "Chart.yaml", "name: widget-crd\nversion: 1.0.0\n");
        let dest = temp.path().join("charts-crd");

        generate_crd_chart_from_template(&template, &dest, "crd-manifest").unwrap();

        assert!(dest.join("Chart.yaml").exists());
        assert!(dest.join("crd-manifest").is_dir());
    }

    #[test]
    fn test_generate_crd_chart_missing_template() {
        let temp = TempDir::new().unwrap();
        let err = generate_crd_chart_from_template(
            &temp.path().join("templates/missing"),
            &temp.path().join("charts-crd"),
            "templates",
        )
        .unwrap_err();

        assert!(matches!(err, CoreError::SubdirectoryNotFound { ref subdirectory, .. } if subdirectory == "missing"));
        assert!(!temp.path().join("charts-crd").exists());
    }

    #[test]
    fn test_copy_and_delete_crds() {
        let temp = TempDir::new().unwrap();
        let chart = temp.path().join("charts");
        write(&chart, "crds/widget.yaml", WIDGET_CRD);
        let dest = temp.path().join("charts-crd/templates");

        assert_eq!(copy_crds(&chart.join("crds"), &dest).unwrap(), 1);
        delete_crds(&chart).unwrap();

        assert!(dest.join("widget.yaml").exists());
        assert!(!chart.join("crds").exists());
    }
}
