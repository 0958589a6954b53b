//! Template Program Manager
//!
//! Default [`ProgramManager`]: expands the embedded fixed-function templates
//! with the defines of a render state and shares program objects whose final
//! source is identical.
//!
//! | Language | Vertex template | Fragment template |
//! |----------|-----------------|-------------------|
//! | `wgsl`   | `wgsl/ffp_vertex.wgsl` | `wgsl/ffp_fragment.wgsl` |
//! | `glsles` | `glsles/ffp_vertex.glsl` | `glsles/ffp_fragment.glsl` |
//!
//! Templates use the engine-wide syntax: `{$ ... $}` blocks, `{{ ... }}`
//! expressions and `$$` line statements. Every define is visible both as a
//! top-level variable and through the `defines` map for computed names.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use minijinja::value::{Object, Value};
use minijinja::{Environment, ErrorKind, UndefinedBehavior, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_128;

use super::{GpuProgram, GpuProgramSet, ProgramManager, ProgramSettings, ShaderStage};
use crate::errors::{Result, ShaderGenError};
use crate::shader_gen::render_state::RenderState;

#[derive(RustEmbed)]
#[folder = "src/shader_gen/program/shaders"]
struct ShaderTemplates;

fn build_environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();

    let syntax = SyntaxConfig::builder()
        .block_delimiters("{$", "$}")
        .variable_delimiters("{{", "}}")
        .line_statement_prefix("$$")
        .build()?;

    env.set_syntax(syntax);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(UndefinedBehavior::SemiStrict);
    env.set_loader(template_loader);

    Ok(env)
}

fn template_loader(name: &str) -> std::result::Result<Option<String>, minijinja::Error> {
    let Some(file) = ShaderTemplates::get(name) else {
        return Ok(None);
    };
    match std::str::from_utf8(file.data.as_ref()) {
        Ok(source) => Ok(Some(source.to_owned())),
        Err(e) => Err(minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("template '{name}' is not UTF-8: {e}"),
        )),
    }
}

fn template_names(language: &str) -> Result<(&'static str, &'static str)> {
    match language {
        "wgsl" => Ok(("wgsl/ffp_vertex.wgsl", "wgsl/ffp_fragment.wgsl")),
        "glsles" => Ok(("glsles/ffp_vertex.glsl", "glsles/ffp_fragment.glsl")),
        other => Err(ShaderGenError::UnsupportedLanguage(other.to_owned())),
    }
}

/// Hands out consecutive vertex input locations while a template renders.
#[derive(Debug, Default)]
struct LocationAllocator {
    counter: AtomicU32,
}

impl Object for LocationAllocator {
    fn call_method(
        self: &Arc<Self>,
        _state: &minijinja::State,
        name: &str,
        _args: &[Value],
    ) -> std::result::Result<Value, minijinja::Error> {
        if name == "next" {
            Ok(Value::from(self.counter.fetch_add(1, Ordering::Relaxed)))
        } else {
            Err(minijinja::Error::new(
                ErrorKind::UnknownMethod,
                format!("method {name} not found"),
            ))
        }
    }
}

#[derive(Serialize)]
struct ProgramContext<'a> {
    #[serde(flatten)]
    flat: &'a BTreeMap<String, String>,
    defines: &'a BTreeMap<String, String>,
    language: &'a str,
    profile: &'a str,
    loc: Value,
}

pub struct TemplateProgramManager {
    env: Environment<'static>,
    /// xxh3-128 of final source → program object.
    programs: FxHashMap<u128, Arc<GpuProgram>>,
    /// (vertex hash, fragment hash) → program set.
    sets: FxHashMap<(u128, u128), Arc<GpuProgramSet>>,
    cache_path: Option<PathBuf>,
    generated: usize,
}

impl TemplateProgramManager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: build_environment()?,
            programs: FxHashMap::default(),
            sets: FxHashMap::default(),
            cache_path: None,
            generated: 0,
        })
    }

    /// Renders one stage without registering a program object.
    pub fn generate_source(
        &self,
        template_name: &str,
        defines: &BTreeMap<String, String>,
        language: &str,
        profile: &str,
    ) -> Result<String> {
        let ctx = ProgramContext {
            flat: defines,
            defines,
            language,
            profile,
            loc: Value::from_object(LocationAllocator::default()),
        };
        let template = self.env.get_template(template_name)?;
        Ok(template.render(&ctx)?)
    }

    /// Number of distinct sources generated so far, shared ones counted once.
    #[inline]
    #[must_use]
    pub fn generated_count(&self) -> usize {
        self.generated
    }

    #[must_use]
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    fn program(
        &mut self,
        stage: ShaderStage,
        template_name: &str,
        defines: &BTreeMap<String, String>,
        language: &str,
        profile: &str,
    ) -> Result<Arc<GpuProgram>> {
        let source = self.generate_source(template_name, defines, language, profile)?;
        let hash = xxh3_128(source.as_bytes());

        if let Some(program) = self.programs.get(&hash) {
            return Ok(Arc::clone(program));
        }

        log::debug!("Generated {stage:?} program from '{template_name}' ({hash:032x})");
        self.generated += 1;
        let program = Arc::new(GpuProgram {
            stage,
            language: language.to_owned(),
            profile: profile.to_owned(),
            source,
            source_hash: hash,
        });
        self.programs.insert(hash, Arc::clone(&program));
        self.write_to_cache(&program);
        Ok(program)
    }

    /// Dumps generated source into the cache directory, if one is set.
    fn write_to_cache(&self, program: &GpuProgram) {
        let Some(dir) = &self.cache_path else {
            return;
        };
        let path = dir.join(format!("{:032x}.{}", program.source_hash, program.language));
        let written =
            std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, &program.source));
        if let Err(e) = written {
            log::warn!("Failed to write shader cache file {}: {e}", path.display());
        }
    }
}

impl ProgramManager for TemplateProgramManager {
    fn acquire(
        &mut self,
        state: &RenderState,
        settings: &ProgramSettings,
    ) -> Result<Arc<GpuProgramSet>> {
        let (vertex_template, fragment_template) = template_names(&settings.language)?;
        let defines = state.shader_defines().to_map();

        let vertex = self.program(
            ShaderStage::Vertex,
            vertex_template,
            &defines,
            &settings.language,
            &settings.vertex_profiles,
        )?;
        let fragment = self.program(
            ShaderStage::Fragment,
            fragment_template,
            &defines,
            &settings.language,
            &settings.fragment_profiles,
        )?;

        let set = self
            .sets
            .entry((vertex.source_hash, fragment.source_hash))
            .or_insert_with(|| {
                Arc::new(GpuProgramSet {
                    vertex,
                    fragment,
                    render_state_hash: state.content_hash(),
                })
            });
        Ok(Arc::clone(set))
    }

    fn release(&mut self, programs: Arc<GpuProgramSet>) {
        drop(programs);
        self.sets.retain(|_, set| Arc::strong_count(set) > 1);
        self.programs.retain(|_, program| Arc::strong_count(program) > 1);
    }

    fn set_cache_path(&mut self, path: Option<&Path>) {
        self.cache_path = path.map(Path::to_path_buf);
    }

    fn program_count(&self) -> usize {
        self.programs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{
        FixedFunctionState, Pass, TrackVertexColour, VertexElements, VertexFormat,
    };
    use crate::shader_gen::ffp::{
        FfpColourFactory, FfpFog, FfpLightingFactory, FfpTransform, FfpTransformFactory,
    };
    use crate::shader_gen::sub_render_state::{BuildContext, SubRenderStateFactory};

    fn settings(language: &str) -> ProgramSettings {
        ProgramSettings {
            language: language.to_owned(),
            vertex_profiles: "vs_test".to_owned(),
            fragment_profiles: "fs_test".to_owned(),
        }
    }

    fn transform_state() -> RenderState {
        RenderState::finalized(vec![Box::new(FfpTransform::default())], [0, 0, 0])
    }

    #[test]
    fn identical_states_share_programs() {
        let mut manager = TemplateProgramManager::new().unwrap();
        let a = manager.acquire(&transform_state(), &settings("wgsl")).unwrap();
        let b = manager.acquire(&transform_state(), &settings("wgsl")).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.program_count(), 2);
        assert_eq!(manager.generated_count(), 2);
    }

    #[test]
    fn release_drops_unreferenced_programs() {
        let mut manager = TemplateProgramManager::new().unwrap();
        let a = manager.acquire(&transform_state(), &settings("wgsl")).unwrap();
        let b = manager.acquire(&transform_state(), &settings("wgsl")).unwrap();

        manager.release(a);
        assert_eq!(manager.program_count(), 2);
        manager.release(b);
        assert_eq!(manager.program_count(), 0);
    }

    #[test]
    fn both_languages_render() {
        let mut manager = TemplateProgramManager::new().unwrap();
        let wgsl = manager.acquire(&transform_state(), &settings("wgsl")).unwrap();
        let glsl = manager.acquire(&transform_state(), &settings("glsles")).unwrap();

        assert!(wgsl.vertex.source.contains("@vertex"));
        assert!(glsl.vertex.source.contains("#version 300 es"));
        assert_eq!(glsl.fragment.profile, "fs_test");
    }

    fn lit_state(track: TrackVertexColour) -> RenderState {
        let mut ff = FixedFunctionState::default().with_vertex_format(VertexFormat {
            elements: VertexElements::POSITION | VertexElements::NORMAL | VertexElements::DIFFUSE,
            tex_coord_sets: 0,
        });
        ff.track_vertex_colour = track;
        let pass = Pass::new("p", ff);
        let ctx = BuildContext {
            src_pass: &pass,
            dst_pass: &pass,
            light_count: [0, 1, 0],
        };
        let factories: [&dyn SubRenderStateFactory; 3] =
            [&FfpTransformFactory, &FfpColourFactory, &FfpLightingFactory];
        let sub_states = factories
            .iter()
            .filter_map(|f| f.create_for_pass(&ctx).unwrap())
            .collect();
        RenderState::finalized(sub_states, [0, 1, 0])
    }

    #[test]
    fn tracked_ambient_reads_vertex_colour() {
        let mut manager = TemplateProgramManager::new().unwrap();
        for language in ["wgsl", "glsles"] {
            let plain = manager
                .acquire(&lit_state(TrackVertexColour::empty()), &settings(language))
                .unwrap();
            let tracked = manager
                .acquire(&lit_state(TrackVertexColour::AMBIENT), &settings(language))
                .unwrap();

            assert!(!plain.vertex.source.contains("colour = vertex_colour.rgb"));
            assert!(tracked.vertex.source.contains("colour = vertex_colour.rgb"));
            assert!(!Arc::ptr_eq(&plain.vertex, &tracked.vertex));
        }
    }

    #[test]
    fn sources_are_written_to_cache_path() {
        let dir = std::env::temp_dir()
            .join(format!("myth_shadergen_cache_{}", std::process::id()));
        let mut manager = TemplateProgramManager::new().unwrap();
        manager.set_cache_path(Some(&dir));

        let set = manager.acquire(&transform_state(), &settings("wgsl")).unwrap();
        let file = dir.join(format!("{:032x}.wgsl", set.vertex.source_hash));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), set.vertex.source);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unknown_language_is_rejected() {
        let mut manager = TemplateProgramManager::new().unwrap();
        let err = manager
            .acquire(&transform_state(), &settings("hlsl"))
            .unwrap_err();
        assert!(matches!(err, ShaderGenError::UnsupportedLanguage(ref l) if l == "hlsl"));
    }

    #[test]
    fn defines_select_template_branches() {
        let manager = TemplateProgramManager::new().unwrap();
        let mut defines = BTreeMap::new();
        defines.insert("FFP_TRANSFORM".to_owned(), "1".to_owned());
        defines.insert("TEX_COORD_SETS".to_owned(), "0".to_owned());
        let plain = manager
            .generate_source("wgsl/ffp_fragment.wgsl", &defines, "wgsl", "fs")
            .unwrap();
        assert!(!plain.contains("fog_factor"));

        let fog = RenderState::finalized(
            vec![Box::new(FfpTransform::default()), Box::new(FfpFog::default())],
            [0, 0, 0],
        );
        let foggy = manager
            .generate_source(
                "wgsl/ffp_fragment.wgsl",
                &fog.shader_defines().to_map(),
                "wgsl",
                "fs",
            )
            .unwrap();
        assert!(foggy.contains("fog_factor"));
    }
}
