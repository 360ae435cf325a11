use std::path::Path;

use anyhow::Context as _;
use tracing::info;

use crate::{
    backend::{GenerateRequest, ImageBackend, ReferenceImage},
    encode::sink::ensure_parent_dir,
    foundation::error::{FlipbookError, FlipbookResult},
};

/// Single-image operations that go straight to the backend, outside the animation pipeline.
#[derive(Clone, Debug)]
pub enum StillOp {
    /// Text-to-image.
    Generate {
        /// What to draw.
        prompt: String,
    },
    /// Change one image according to an instruction.
    Edit {
        /// Edit instruction.
        prompt: String,
        /// Image to edit.
        image: ReferenceImage,
    },
    /// Combine several images into one scene.
    Compose {
        /// How to combine them.
        prompt: String,
        /// Two or more source images.
        images: Vec<ReferenceImage>,
    },
    /// Re-render the content image in the style of the style image.
    StyleTransfer {
        /// Image providing the subject.
        content: ReferenceImage,
        /// Image providing the look.
        style: ReferenceImage,
        /// Optional extra guidance.
        prompt: Option<String>,
    },
}

impl StillOp {
    /// Check input counts and prompts.
    pub fn validate(&self) -> FlipbookResult<()> {
        match self {
            Self::Generate { prompt } | Self::Edit { prompt, .. } => require_prompt(prompt),
            Self::Compose { prompt, images } => {
                require_prompt(prompt)?;
                if images.len() < 2 {
                    return Err(FlipbookError::invalid_request(format!(
                        "compose needs at least 2 images, got {}",
                        images.len()
                    )));
                }
                Ok(())
            }
            Self::StyleTransfer { .. } => Ok(()),
        }
    }

    /// Full prompt text sent to the backend.
    pub fn prompt_text(&self) -> String {
        match self {
            Self::Generate { prompt } => prompt.trim().to_string(),
            Self::Edit { prompt, .. } => format!(
                "Edit the provided image: {}. Keep everything else unchanged.",
                prompt.trim()
            ),
            Self::Compose { prompt, images } => format!(
                "Combine the {} provided images into a single coherent image: {}",
                images.len(),
                prompt.trim()
            ),
            Self::StyleTransfer { prompt, .. } => {
                let mut text = String::from(
                    "Redraw the first image in the artistic style of the second image, \
                     keeping the subject and composition of the first image",
                );
                if let Some(extra) = prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                    text.push_str(". ");
                    text.push_str(extra);
                }
                text
            }
        }
    }

    /// Reference images in the order the prompt refers to them.
    pub fn reference_images(&self) -> Vec<ReferenceImage> {
        match self {
            Self::Generate { .. } => Vec::new(),
            Self::Edit { image, .. } => vec![image.clone()],
            Self::Compose { images, .. } => images.clone(),
            Self::StyleTransfer { content, style, .. } => vec![content.clone(), style.clone()],
        }
    }

    /// Run the operation and return the encoded image.
    pub fn run(&self, backend: &dyn ImageBackend) -> FlipbookResult<Vec<u8>> {
        self.validate()?;
        let prompt = self.prompt_text();
        let refs = self.reference_images();
        backend.generate(&GenerateRequest {
            prompt: &prompt,
            reference_images: &refs,
            timeout: None,
        })
    }

    /// Run the operation and write the image to `out_path`.
    pub fn run_to_file(&self, backend: &dyn ImageBackend, out_path: &Path) -> FlipbookResult<()> {
        let bytes = self.run(backend)?;
        ensure_parent_dir(out_path)?;
        std::fs::write(out_path, &bytes)
            .with_context(|| format!("write image '{}'", out_path.display()))?;
        info!(path = %out_path.display(), bytes = bytes.len(), "image written");
        Ok(())
    }
}

fn require_prompt(prompt: &str) -> FlipbookResult<()> {
    if prompt.trim().is_empty() {
        return Err(FlipbookError::invalid_request("prompt must be non-empty"));
    }
    Ok(())
}
