// SPDX-License-Identifier: MIT OR Apache-2.0
//! Program descriptors and the shader cross-compilation seam.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
            ShaderStage::Compute => "compute",
        }
    }
}

/// One stage's source. Exactly one of `glsl`/`wgsl` may be populated; mixing
/// both for a single stage is a caller error, checked at program creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageDescriptor {
    pub glsl: Option<String>,
    pub wgsl: Option<String>,
    pub entry_point: Option<String>,
}

impl StageDescriptor {
    pub fn glsl(source: impl Into<String>) -> Self {
        StageDescriptor {
            glsl: Some(source.into()),
            ..Default::default()
        }
    }

    pub fn wgsl(source: impl Into<String>) -> Self {
        StageDescriptor {
            wgsl: Some(source.into()),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self, stage: ShaderStage) {
        if self.glsl.is_some() && self.wgsl.is_some() {
            crate::api::whoops(&format!(
                "program stage {} supplies both glsl and wgsl",
                stage.as_str()
            ));
        }
        if self.glsl.is_none() && self.wgsl.is_none() {
            crate::api::whoops(&format!(
                "program stage {} supplies neither glsl nor wgsl",
                stage.as_str()
            ));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramDescriptor {
    pub vertex: Option<StageDescriptor>,
    pub fragment: Option<StageDescriptor>,
    pub compute: Option<StageDescriptor>,
    pub debug_name: Option<String>,
}

impl ProgramDescriptor {
    /// Render program from already-written sources in one language.
    pub fn render(vertex: StageDescriptor, fragment: StageDescriptor) -> Self {
        ProgramDescriptor {
            vertex: Some(vertex),
            fragment: Some(fragment),
            ..Default::default()
        }
    }

    pub fn compute(compute: StageDescriptor) -> Self {
        ProgramDescriptor {
            compute: Some(compute),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) {
        if let Some(vertex) = &self.vertex {
            vertex.validate(ShaderStage::Vertex);
        }
        if let Some(fragment) = &self.fragment {
            fragment.validate(ShaderStage::Fragment);
        }
        if let Some(compute) = &self.compute {
            compute.validate(ShaderStage::Compute);
        }
        if self.compute.is_some() && (self.vertex.is_some() || self.fragment.is_some()) {
            crate::api::whoops("program mixes compute and render stages");
        }
    }
}

/// External GLSL↔WGSL cross-compiler seam.
///
/// The device never compiles shaders across languages itself; a backend that
/// is handed the wrong language calls into an installed compiler with
/// already-preprocessed source, or fails with
/// [`crate::api::Error::ShaderCompilation`] when none is installed.
pub trait ShaderCompiler {
    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        validation_enabled: bool,
    ) -> Result<String, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "both glsl and wgsl")]
    fn mixed_languages_in_one_stage_rejected() {
        let mut stage = StageDescriptor::wgsl("@vertex fn main() {}");
        stage.glsl = Some("void main() {}".into());
        stage.validate(ShaderStage::Vertex);
    }

    #[test]
    #[should_panic(expected = "mixes compute and render")]
    fn compute_plus_render_rejected() {
        let descriptor = ProgramDescriptor {
            vertex: Some(StageDescriptor::wgsl("@vertex fn main() {}")),
            compute: Some(StageDescriptor::wgsl("@compute fn main() {}")),
            ..Default::default()
        };
        descriptor.validate();
    }
}
