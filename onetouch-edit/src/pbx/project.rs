use super::{PbxObject, PbxValue, parse};
use crate::error::{EditError, EditResult};
use sha2::{Digest, Sha256};
use tracing::debug;

const APPLICATION_PRODUCT: &str = "com.apple.product-type.application";
pub const RESOURCES_PHASE: &str = "PBXResourcesBuildPhase";

/// Object graph of an Xcode project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbxProject {
    root: PbxObject,
}

impl PbxProject {
    pub fn parse(src: &str) -> EditResult<Self> {
        match parse(src)? {
            PbxValue::Object(root) => {
                if root.get("objects").and_then(PbxValue::as_object).is_none() {
                    return Err(graph_error("missing objects dictionary"));
                }
                Ok(Self { root })
            }
            _ => Err(graph_error("root is not a dictionary")),
        }
    }

    pub fn render(&self) -> String {
        PbxValue::Object(self.root.clone()).render()
    }

    fn objects(&self) -> &PbxObject {
        self.root
            .get("objects")
            .and_then(PbxValue::as_object)
            .unwrap_or(&EMPTY)
    }

    fn objects_mut(&mut self) -> EditResult<&mut PbxObject> {
        self.root
            .get_mut("objects")
            .and_then(PbxValue::as_object_mut)
            .ok_or_else(|| graph_error("missing objects dictionary"))
    }

    pub fn object(&self, id: &str) -> Option<&PbxObject> {
        self.objects().get(id).and_then(PbxValue::as_object)
    }

    fn object_mut(&mut self, id: &str) -> EditResult<&mut PbxObject> {
        self.objects_mut()?
            .get_mut(id)
            .and_then(PbxValue::as_object_mut)
            .ok_or_else(|| graph_error(format!("object {id} not found")))
    }

    /// `(id, object)` for every object of the given `isa`, in file order.
    pub fn objects_of(&self, isa: &str) -> impl Iterator<Item = (&str, &PbxObject)> {
        self.objects().iter().filter_map(move |(id, v)| {
            let obj = v.as_object()?;
            (obj.get_str("isa") == Some(isa)).then_some((id, obj))
        })
    }

    /// Name of the first native target that builds an application.
    pub fn app_target_name(&self) -> Option<String> {
        self.objects_of("PBXNativeTarget")
            .find(|(_, t)| t.get_str("productType") == Some(APPLICATION_PRODUCT))
            .and_then(|(_, t)| t.get_str("name"))
            .map(str::to_string)
    }

    pub fn target_id(&self, name: &str) -> Option<String> {
        self.objects_of("PBXNativeTarget")
            .find(|(_, t)| t.get_str("name") == Some(name))
            .map(|(id, _)| id.to_string())
    }

    /// Build configuration ids of `target`, optionally restricted to one build name
    /// (`Debug`, `Release`).
    pub fn build_configuration_ids(
        &self,
        target: &str,
        build: Option<&str>,
    ) -> EditResult<Vec<String>> {
        let target_id = self
            .target_id(target)
            .ok_or_else(|| graph_error(format!("target '{target}' not found")))?;
        let list_id = self
            .object(&target_id)
            .and_then(|t| t.get_str("buildConfigurationList"))
            .ok_or_else(|| graph_error(format!("target '{target}' has no configuration list")))?;
        let configs = self
            .object(list_id)
            .and_then(|l| l.get("buildConfigurations"))
            .and_then(PbxValue::as_array)
            .ok_or_else(|| graph_error(format!("configuration list {list_id} not found")))?;

        Ok(configs
            .iter()
            .filter_map(PbxValue::as_str)
            .filter(|id| match build {
                Some(b) => self.object(id).and_then(|c| c.get_str("name")) == Some(b),
                None => true,
            })
            .map(str::to_string)
            .collect())
    }

    /// Build setting of the first matching configuration.
    pub fn build_setting(&self, target: &str, build: Option<&str>, key: &str) -> Option<String> {
        let ids = self.build_configuration_ids(target, build).ok()?;
        ids.iter().find_map(|id| {
            self.object(id)?
                .get("buildSettings")?
                .as_object()?
                .get_str(key)
                .map(str::to_string)
        })
    }

    /// Set a build setting on every matching configuration. Returns whether anything changed.
    pub fn set_build_setting(
        &mut self,
        target: &str,
        build: Option<&str>,
        key: &str,
        value: &str,
    ) -> EditResult<bool> {
        let ids = self.build_configuration_ids(target, build)?;
        if ids.is_empty() {
            return Err(graph_error(format!(
                "target '{target}' has no build configuration {}",
                build.unwrap_or("")
            )));
        }

        let mut changed = false;
        for id in ids {
            let config = self.object_mut(&id)?;
            if !config.contains_key("buildSettings") {
                config.insert("buildSettings", PbxValue::Object(PbxObject::new()));
            }
            let settings = config
                .get_mut("buildSettings")
                .and_then(PbxValue::as_object_mut)
                .ok_or_else(|| graph_error(format!("configuration {id} has no build settings")))?;
            if settings.get_str(key) != Some(value) {
                settings.insert(key, PbxValue::string(value));
                changed = true;
            }
        }
        if changed {
            debug!(target_name = target, key, value, "set build setting");
        }
        Ok(changed)
    }

    pub fn main_group(&self) -> Option<String> {
        let root_id = self.root.get_str("rootObject")?;
        self.object(root_id)?
            .get_str("mainGroup")
            .map(str::to_string)
    }

    pub fn group_by_name(&self, name: &str) -> Option<String> {
        self.objects_of("PBXGroup")
            .find(|(_, g)| g.get_str("name") == Some(name))
            .map(|(id, _)| id.to_string())
    }

    /// A group whose name or path is `name`; the scaffolded app folder carries only a path.
    pub fn group_by_name_or_path(&self, name: &str) -> Option<String> {
        self.objects_of("PBXGroup")
            .find(|(_, g)| g.get_str("name") == Some(name) || g.get_str("path") == Some(name))
            .map(|(id, _)| id.to_string())
    }

    /// The first group with neither name nor path, which is the project's main group in a
    /// scaffolded project.
    pub fn anonymous_group(&self) -> Option<String> {
        self.objects_of("PBXGroup")
            .find(|(_, g)| !g.contains_key("name") && !g.contains_key("path"))
            .map(|(id, _)| id.to_string())
            .or_else(|| self.main_group())
    }

    /// Add an empty group under the main group and return its id.
    pub fn add_group(&mut self, name: &str, path: &str) -> EditResult<String> {
        let main = self
            .main_group()
            .ok_or_else(|| graph_error("project has no main group"))?;
        let id = self.generate_id(&format!("PBXGroup/{name}/{path}"));

        let group = PbxObject::from_iter([
            ("isa", PbxValue::string("PBXGroup")),
            ("children", PbxValue::Array(Vec::new())),
            ("name", PbxValue::string(name)),
            ("path", PbxValue::string(path)),
            ("sourceTree", PbxValue::string("<group>")),
        ]);
        self.objects_mut()?
            .insert(id.clone(), PbxValue::Object(group));
        push_child(self.object_mut(&main)?, "children", &id)?;

        debug!(name, path, id = %id, "added group");
        Ok(id)
    }

    /// Register `path` as a file in `group` and in the target's resources build phase.
    /// Returns `false` if the group already references the file.
    pub fn add_resource_file(
        &mut self,
        path: &str,
        group: &str,
        target: Option<&str>,
    ) -> EditResult<bool> {
        let group_obj = self
            .object(group)
            .ok_or_else(|| graph_error(format!("group {group} not found")))?;
        let already = group_obj
            .get("children")
            .and_then(PbxValue::as_array)
            .unwrap_or_default()
            .iter()
            .filter_map(PbxValue::as_str)
            .filter_map(|id| self.object(id))
            .any(|f| f.get_str("path") == Some(path));
        if already {
            return Ok(false);
        }

        let phase_id = self.resources_phase(target)?;
        let file_id = self.generate_id(&format!("PBXFileReference/{group}/{path}"));
        let name = path.rsplit('/').next().unwrap_or(path);

        let mut file_ref = PbxObject::from_iter([
            ("isa", PbxValue::string("PBXFileReference")),
            ("lastKnownFileType", PbxValue::string(file_type(path))),
        ]);
        if name != path {
            file_ref.insert("name", PbxValue::string(name));
        }
        file_ref.insert("path", PbxValue::string(path));
        file_ref.insert("sourceTree", PbxValue::string("<group>"));
        self.objects_mut()?
            .insert(file_id.clone(), PbxValue::Object(file_ref));

        let build_id = self.generate_id(&format!("PBXBuildFile/{file_id}"));
        let build_file = PbxObject::from_iter([
            ("isa", PbxValue::string("PBXBuildFile")),
            ("fileRef", PbxValue::string(file_id.clone())),
        ]);
        self.objects_mut()?
            .insert(build_id.clone(), PbxValue::Object(build_file));

        push_child(self.object_mut(group)?, "children", &file_id)?;
        push_child(self.object_mut(&phase_id)?, "files", &build_id)?;

        debug!(path, group, file = %file_id, "added resource file");
        Ok(true)
    }

    fn resources_phase(&self, target: Option<&str>) -> EditResult<String> {
        match target {
            Some(name) => {
                let target_id = self
                    .target_id(name)
                    .ok_or_else(|| graph_error(format!("target '{name}' not found")))?;
                self.object(&target_id)
                    .and_then(|t| t.get("buildPhases"))
                    .and_then(PbxValue::as_array)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(PbxValue::as_str)
                    .find(|id| {
                        self.object(id).and_then(|p| p.get_str("isa")) == Some(RESOURCES_PHASE)
                    })
                    .map(str::to_string)
                    .ok_or_else(|| graph_error(format!("target '{name}' has no resources phase")))
            }
            None => self
                .objects_of(RESOURCES_PHASE)
                .map(|(id, _)| id.to_string())
                .next()
                .ok_or_else(|| graph_error("project has no resources phase")),
        }
    }

    /// Deterministic 24-hex-digit object id derived from `seed`, unique in this project.
    fn generate_id(&self, seed: &str) -> String {
        let mut attempt = 0u32;
        loop {
            let mut hasher = Sha256::new();
            hasher.update(seed.as_bytes());
            hasher.update(attempt.to_le_bytes());
            let id = hex::encode_upper(hasher.finalize())[..24].to_string();
            if !self.objects().contains_key(&id) {
                return id;
            }
            attempt += 1;
        }
    }
}

static EMPTY: PbxObject = PbxObject {
    entries: Vec::new(),
};

fn push_child(obj: &mut PbxObject, key: &str, id: &str) -> EditResult<()> {
    if !obj.contains_key(key) {
        obj.insert(key, PbxValue::Array(Vec::new()));
    }
    let items = obj
        .get_mut(key)
        .and_then(PbxValue::as_array_mut)
        .ok_or_else(|| graph_error(format!("'{key}' is not a list")))?;
    items.push(PbxValue::string(id));
    Ok(())
}

fn file_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("plist") => "text.plist.xml",
        Some("caf") => "file",
        Some("json") => "text.json",
        Some("xml") => "text.xml",
        Some("png") => "image.png",
        Some("storyboard") => "file.storyboard",
        _ => "file",
    }
}

fn graph_error(message: impl Into<String>) -> EditError {
    EditError::PbxGraph {
        message: message.into(),
    }
}
