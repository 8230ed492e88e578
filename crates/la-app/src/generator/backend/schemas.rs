use image::DynamicImage;
use la_core::imaging::encode_png_base64;
use la_core::LineartJob;
use serde::{Deserialize, Serialize};

const SAMPLER: &str = "Euler a";
const STEPS: u32 = 20;
const CFG_SCALE: f32 = 7.0;
const MASK_BLUR: u32 = 4;

/// `inpainting_fill` value for "original".
const INPAINT_FILL_ORIGINAL: u8 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct Img2ImgRequest {
    pub init_images: Vec<String>,
    pub mask: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub seed: i64,
    pub sampler_name: String,
    pub steps: u32,
    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
    pub denoising_strength: f32,
    pub mask_blur: u32,
    pub inpainting_fill: u8,
    pub inpaint_full_res: bool,
    pub alwayson_scripts: AlwaysOnScripts,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlwaysOnScripts {
    #[serde(rename = "ControlNet")]
    pub control_net: ControlNetArgs,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlNetArgs {
    pub args: Vec<ControlUnit>,
}

/// One ControlNet unit: how an auxiliary image conditions generation.
#[derive(Debug, Clone, Serialize)]
pub struct ControlUnit {
    pub image: String,
    pub mask_image: Option<String>,
    pub control_mode: String,
    pub enabled: bool,
    pub guidance_start: f32,
    pub guidance_end: f32,
    pub pixel_perfect: bool,
    pub processor_res: u32,
    pub resize_mode: String,
    pub weight: f32,
    pub module: String,
    pub model: String,
    pub save_detected_map: Option<bool>,
    pub hr_option: String,
}

impl ControlUnit {
    pub fn new(image: String, model: &str, weight: f32) -> Self {
        Self {
            image,
            mask_image: None,
            control_mode: "Balanced".into(),
            enabled: true,
            guidance_start: 0.0,
            guidance_end: 1.0,
            pixel_perfect: true,
            processor_res: 512,
            resize_mode: "Just Resize".into(),
            weight,
            module: "None".into(),
            model: model.to_string(),
            save_detected_map: None,
            hr_option: "Both".into(),
        }
    }
}

impl Img2ImgRequest {
    pub fn from_job(job: &LineartJob) -> la_core::Result<Self> {
        let (width, height) = job.base_size();
        let encode = |img: &image::RgbImage| encode_png_base64(&DynamicImage::ImageRgb8(img.clone()));

        let unit = ControlUnit::new(
            encode(&job.control_image)?,
            job.mode.control_model(),
            job.lineart_fidelity,
        );

        Ok(Self {
            init_images: vec![encode(&job.init_image)?],
            mask: encode(&job.mask_image)?,
            prompt: job.prompt.clone(),
            negative_prompt: job.negative_prompt.clone(),
            seed: -1,
            sampler_name: SAMPLER.into(),
            steps: STEPS,
            cfg_scale: CFG_SCALE,
            width,
            height,
            denoising_strength: job.image_fidelity,
            mask_blur: MASK_BLUR,
            inpainting_fill: INPAINT_FILL_ORIGINAL,
            inpaint_full_res: false,
            alwayson_scripts: AlwaysOnScripts {
                control_net: ControlNetArgs { args: vec![unit] },
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Img2ImgResponse {
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoraInfo {
    pub name: String,
    #[serde(default)]
    pub alias: String,
}

impl LoraInfo {
    /// Drop-down label; falls back to the name when the alias is blank.
    pub fn label(&self) -> String {
        let alias = if self.alias.trim().is_empty() { &self.name } else { &self.alias };
        la_core::prompt::lora_option_label(&self.name, alias)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterrogateRequest {
    pub image: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterrogateResponse {
    pub caption: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use la_core::{LineartMode, PromptInputs};

    fn canny_job() -> LineartJob {
        let input = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([200, 10, 10])));
        let lineart = GrayImage::from_pixel(64, 48, Luma([0]));
        LineartJob::prepare(LineartMode::Canny, &input, Some(&lineart), &PromptInputs::default()).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let job = canny_job();
        let value = serde_json::to_value(Img2ImgRequest::from_job(&job).unwrap()).unwrap();

        assert_eq!(value["width"], 1152);
        assert_eq!(value["height"], 896);
        assert_eq!(value["denoising_strength"], 1.0);
        assert_eq!(value["init_images"].as_array().unwrap().len(), 1);
        assert_eq!(value["prompt"], job.prompt.as_str());

        let unit = &value["alwayson_scripts"]["ControlNet"]["args"][0];
        assert_eq!(unit["model"], "control-lora-canny-rank256 [ec2dbbe4]");
        assert_eq!(unit["resize_mode"], "Just Resize");
        assert_eq!(unit["control_mode"], "Balanced");
        assert_eq!(unit["weight"], 1.0);
        assert_eq!(unit["guidance_start"], 0.0);
        assert_eq!(unit["guidance_end"], 1.0);
        assert!(unit["mask_image"].is_null());
    }

    #[test]
    fn test_cutout_request_conditions_on_base_image() {
        let input = DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 60, Rgb([30, 60, 90])));
        let job = LineartJob::prepare(LineartMode::Cutout, &input, None, &PromptInputs::default()).unwrap();
        let request = Img2ImgRequest::from_job(&job).unwrap();

        let unit = &request.alwayson_scripts.control_net.args[0];
        assert_eq!(unit.model, "CN-anytest_v4-marged_am_dim256 [49b6c950]");
        assert_eq!(unit.weight, job.lineart_fidelity);

        let control = la_core::imaging::decode_base64_image(&unit.image).unwrap().to_rgb8();
        assert_eq!(control.dimensions(), (1152, 896));
        assert_eq!(control, job.control_image);
        assert_eq!(control.get_pixel(576, 448), &Rgb([30, 60, 90]));
    }

    #[test]
    fn test_control_image_is_decodable_png() {
        let job = canny_job();
        let request = Img2ImgRequest::from_job(&job).unwrap();
        let unit = &request.alwayson_scripts.control_net.args[0];
        let decoded = la_core::imaging::decode_base64_image(&unit.image).unwrap();
        assert_eq!((decoded.width(), decoded.height()), job.base_size());
    }

    #[test]
    fn test_lora_label_falls_back_to_name() {
        let with_alias: LoraInfo = serde_json::from_str(r#"{"name":"sdxl_BWLine","alias":"bw"}"#).unwrap();
        let without: LoraInfo = serde_json::from_str(r#"{"name":"ink","path":"/x/ink.safetensors"}"#).unwrap();
        assert_eq!(with_alias.label(), "sdxl_BWLine (bw)");
        assert_eq!(without.label(), "ink (ink)");
    }
}
