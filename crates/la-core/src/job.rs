use image::{DynamicImage, GrayImage, RgbImage};
use log::info;

use crate::error::{Error, Result};
use crate::imaging::{self, WHITE};
use crate::model_types::LineartMode;
use crate::prompt;

/// Denoising strength for the all-white init image; the control unit
/// carries all of the structure.
pub const IMAGE_FIDELITY: f32 = 1.0;

pub const LINEART_FIDELITY_MIN: f32 = 0.5;
pub const LINEART_FIDELITY_MAX: f32 = 1.25;
pub const LINEART_FIDELITY_DEFAULT: f32 = 1.0;
pub const LINEART_BOLD_DEFAULT: f32 = 0.0;

/// What the user typed and dialled in.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptInputs {
    pub prompt: String,
    pub negative_prompt: String,
    /// Control weight of the line-art unit.
    pub fidelity: f32,
    /// Thin vs bold line LoRA balance.
    pub bold: f32,
}

impl Default for PromptInputs {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            negative_prompt: prompt::DEFAULT_NEGATIVE_PROMPT.to_string(),
            fidelity: LINEART_FIDELITY_DEFAULT,
            bold: LINEART_BOLD_DEFAULT,
        }
    }
}

/// A fully prepared generation request, ready to hand to a backend.
#[derive(Debug, Clone)]
pub struct LineartJob {
    pub mode: LineartMode,
    pub prompt: String,
    pub negative_prompt: String,
    /// White canvas at the bucket size.
    pub init_image: RgbImage,
    pub mask_image: RgbImage,
    pub control_image: RgbImage,
    /// Size of the original upload; the result is scaled back to it.
    pub output_size: (u32, u32),
    pub image_fidelity: f32,
    pub lineart_fidelity: f32,
}

impl LineartJob {
    pub fn prepare(
        mode: LineartMode,
        input: &DynamicImage,
        lineart: Option<&GrayImage>,
        inputs: &PromptInputs,
    ) -> Result<Self> {
        if input.width() == 0 || input.height() == 0 {
            return Err(Error::InvalidInput("input image is empty".into()));
        }

        let prompt = prompt::build_lineart_prompt(&inputs.prompt, inputs.bold);
        let negative_prompt = prompt::build_negative_prompt(&inputs.negative_prompt);

        let base = imaging::resize_to_bucket(&imaging::flatten_on_white(input));
        let (width, height) = base.dimensions();

        let control_image = match mode {
            LineartMode::Canny => {
                let lineart = lineart.ok_or(Error::MissingLineart("Canny"))?;
                imaging::fit_to(&DynamicImage::ImageLuma8(lineart.clone()), width, height)
            }
            LineartMode::Cutout => base,
        };

        let job = Self {
            mode,
            prompt,
            negative_prompt,
            init_image: imaging::blank_canvas(width, height, WHITE),
            mask_image: imaging::blank_canvas(width, height, WHITE),
            control_image,
            output_size: (input.width(), input.height()),
            image_fidelity: IMAGE_FIDELITY,
            lineart_fidelity: inputs.fidelity.clamp(LINEART_FIDELITY_MIN, LINEART_FIDELITY_MAX),
        };

        info!(
            "Prepared {} job at {}x{} (output {}x{})",
            mode.id(),
            width,
            height,
            job.output_size.0,
            job.output_size.1
        );

        Ok(job)
    }

    pub fn base_size(&self) -> (u32, u32) {
        self.init_image.dimensions()
    }
}
