pub mod schemas;

use std::path::Path;
use image::DynamicImage;
use la_core::{imaging, LineartJob};
use log::info;
use reqwest::blocking::{Client, Response};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::generator::backend::schemas::{
    Img2ImgRequest, Img2ImgResponse, InterrogateRequest, InterrogateResponse, LoraInfo,
};

/// The remote service that does the actual image generation.
pub trait GenBackend: Send {
    /// Run the job and return the result scaled to `job.output_size`.
    fn generate(&self, job: &LineartJob) -> anyhow::Result<DynamicImage>;

    fn list_loras(&self) -> anyhow::Result<Vec<LoraInfo>>;

    /// Tag the image with the backend's captioning model.
    fn interrogate(&self, image: &DynamicImage) -> anyhow::Result<String>;
}

/// Client for a Stable Diffusion WebUI compatible API.
pub struct SdBackend {
    client: Client,
    base_url: String,
    interrogate_model: String,
}

impl SdBackend {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            interrogate_model: config.interrogate_model.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(response: Response) -> anyhow::Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(anyhow::Error::from(AppError::BackendError(
                format!("HTTP {}: {}", status, body)
            )));
        }

        Ok(response)
    }
}

impl GenBackend for SdBackend {
    fn generate(&self, job: &LineartJob) -> anyhow::Result<DynamicImage> {
        let request = Img2ImgRequest::from_job(job)?;
        info!("POST img2img {}x{} ({})", request.width, request.height, job.mode.id());

        let response = self.client
            .post(self.url("/sdapi/v1/img2img"))
            .json(&request)
            .send()?;

        let body: Img2ImgResponse = Self::check(response)?.json()?;
        let first = body.images.first()
            .ok_or_else(|| AppError::BackendError("No images in img2img response".into()))?;

        let image = imaging::decode_base64_image(first)?;
        let (width, height) = job.output_size;

        Ok(DynamicImage::ImageRgb8(imaging::fit_to(&image, width, height)))
    }

    fn list_loras(&self) -> anyhow::Result<Vec<LoraInfo>> {
        let response = self.client
            .get(self.url("/sdapi/v1/loras"))
            .send()?;

        Ok(Self::check(response)?.json()?)
    }

    fn interrogate(&self, image: &DynamicImage) -> anyhow::Result<String> {
        let request = InterrogateRequest {
            image: imaging::encode_png_base64(image)?,
            model: self.interrogate_model.clone(),
        };

        let response = self.client
            .post(self.url("/sdapi/v1/interrogate"))
            .json(&request)
            .send()?;

        let body: InterrogateResponse = Self::check(response)?.json()?;
        Ok(body.caption)
    }
}

pub fn save_output(image: &DynamicImage, destination: &Path) -> anyhow::Result<()> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save_with_format(destination, image::ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use la_core::{LineartMode, PromptInputs};

    /// Serve exactly one HTTP response and hand back the request line and body.
    fn one_shot_server(status: &str, body: String) -> (String, mpsc::Receiver<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let status = status.to_string();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut content_length = 0usize;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }

            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
            stream.flush().unwrap();

            let _ = tx.send((request_line.trim().to_string(), String::from_utf8_lossy(&request_body).to_string()));
        });

        (format!("http://{}", addr), rx)
    }

    fn backend(url: String) -> SdBackend {
        let config = AppConfig::from_lookup(|key| match key {
            "LINEART_API_URL" => Some(url.clone()),
            "LINEART_INTERROGATE_MODEL" => Some("clip".into()),
            _ => None,
        })
        .unwrap();
        SdBackend::new(&config).unwrap()
    }

    #[test]
    fn test_list_loras() {
        let (url, rx) = one_shot_server(
            "200 OK",
            r#"[{"name":"sdxl_BWLine","alias":"bwline","path":"/m/a.safetensors"},{"name":"ink"}]"#.into(),
        );

        let loras = backend(url).list_loras().unwrap();
        assert_eq!(loras.len(), 2);
        assert_eq!(loras[0].label(), "sdxl_BWLine (bwline)");

        let (request_line, _) = rx.recv().unwrap();
        assert_eq!(request_line, "GET /sdapi/v1/loras HTTP/1.1");
    }

    #[test]
    fn test_generate_scales_result_to_input_size() {
        let result = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([0, 0, 0])));
        let b64 = imaging::encode_png_base64(&result).unwrap();
        let (url, rx) = one_shot_server("200 OK", format!(r#"{{"images":["{}"],"info":"{{}}"}}"#, b64));

        let input = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([255, 255, 255])));
        let lineart = GrayImage::from_pixel(40, 30, Luma([0]));
        let job = LineartJob::prepare(LineartMode::Canny, &input, Some(&lineart), &PromptInputs::default()).unwrap();

        let output = backend(url).generate(&job).unwrap();
        assert_eq!((output.width(), output.height()), (40, 30));

        let (request_line, body) = rx.recv().unwrap();
        assert_eq!(request_line, "POST /sdapi/v1/img2img HTTP/1.1");
        let sent: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sent["negative_prompt"], job.negative_prompt.as_str());
    }

    #[test]
    fn test_interrogate_uses_configured_model() {
        let (url, rx) = one_shot_server("200 OK", r#"{"caption":"1girl, solo, red hair"}"#.into());

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])));
        let caption = backend(url).interrogate(&image).unwrap();
        assert_eq!(caption, "1girl, solo, red hair");

        let (_, body) = rx.recv().unwrap();
        let sent: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sent["model"], "clip");
    }

    #[test]
    fn test_http_error_is_backend_error() {
        let (url, _rx) = one_shot_server("500 Internal Server Error", r#"{"error":"boom"}"#.into());

        let err = backend(url).list_loras().unwrap_err();
        let app_err = err.downcast_ref::<AppError>().unwrap();
        assert!(matches!(app_err, AppError::BackendError(msg) if msg.contains("500") && msg.contains("boom")));
    }

    #[test]
    fn test_save_output_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.png");
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));

        save_output(&image, &path).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgb8(), image.to_rgb8());
    }
}
