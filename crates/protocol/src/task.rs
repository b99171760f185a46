use crate::error::{InvokeError, Result};
use crate::invoker::ModelRequest;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The fixed capability set every model call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    TextGenerate,
    TextEmbed,
    ImageEmbed,
    ImageGenerate,
}

impl TaskKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextGenerate => "text_generate",
            Self::TextEmbed => "text_embed",
            Self::ImageEmbed => "image_embed",
            Self::ImageGenerate => "image_generate",
        }
    }
}

/// Model families with structurally different request/response bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    TitanText,
    Llama,
    CohereCommand,
    TitanEmbedText,
    TitanEmbedImage,
    TitanImage,
    StableDiffusion,
}

impl ModelFamily {
    /// Infer the family from a hosted model id such as `amazon.titan-text-express-v1`
    /// or a cross-region profile such as `us.meta.llama3-8b-instruct-v1:0`.
    #[must_use]
    pub fn detect(model_id: &str) -> Option<Self> {
        let id = model_id.trim().to_ascii_lowercase();
        if id.contains("titan-embed-image") {
            Some(Self::TitanEmbedImage)
        } else if id.contains("titan-embed") {
            Some(Self::TitanEmbedText)
        } else if id.contains("titan-image-generator") {
            Some(Self::TitanImage)
        } else if id.contains("titan-text") || id.contains("titan-tg1") {
            Some(Self::TitanText)
        } else if id.contains("meta.llama") {
            Some(Self::Llama)
        } else if id.contains("cohere.command") {
            Some(Self::CohereCommand)
        } else if id.contains("stability.") {
            Some(Self::StableDiffusion)
        } else {
            None
        }
    }

    pub fn require(model_id: &str) -> Result<Self> {
        Self::detect(model_id).ok_or_else(|| InvokeError::UnsupportedModel(model_id.to_string()))
    }

    #[must_use]
    pub const fn task_kind(self) -> TaskKind {
        match self {
            Self::TitanText | Self::Llama | Self::CohereCommand => TaskKind::TextGenerate,
            Self::TitanEmbedText => TaskKind::TextEmbed,
            Self::TitanEmbedImage => TaskKind::ImageEmbed,
            Self::TitanImage | Self::StableDiffusion => TaskKind::ImageGenerate,
        }
    }
}

/// Sampling knobs sent with every text-generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default)]
    pub top_k: Option<u32>,
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_temperature() -> f64 {
    0.5
}

const fn default_top_p() -> f64 {
    0.85
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            stop_sequences: Vec::new(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: None,
        }
    }
}

impl SamplingParams {
    /// Reproducible sampling: temperature 0, full nucleus
    #[must_use]
    pub fn deterministic() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_stop_sequences<I, S>(mut self, stops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_sequences = stops.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub number_of_images: u32,
    pub height: u32,
    pub width: u32,
    pub cfg_scale: f64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            number_of_images: 1,
            height: 512,
            width: 512,
            cfg_scale: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageGeneration {
    TextToImage {
        prompt: String,
        negative_prompt: Option<String>,
        style_preset: Option<String>,
        config: ImageConfig,
    },
    Inpaint {
        prompt: String,
        negative_prompt: Option<String>,
        image: Vec<u8>,
        mask_prompt: String,
        config: ImageConfig,
    },
}

impl ImageGeneration {
    pub fn text_to_image(prompt: impl Into<String>) -> Self {
        Self::TextToImage {
            prompt: prompt.into(),
            negative_prompt: None,
            style_preset: None,
            config: ImageConfig::default(),
        }
    }
}

/// One model call, tagged by capability
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTask {
    TextGenerate {
        prompt: String,
        params: SamplingParams,
    },
    TextEmbed {
        text: String,
    },
    ImageEmbed {
        image: Vec<u8>,
    },
    ImageGenerate(ImageGeneration),
}

impl ModelTask {
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        match self {
            Self::TextGenerate { .. } => TaskKind::TextGenerate,
            Self::TextEmbed { .. } => TaskKind::TextEmbed,
            Self::ImageEmbed { .. } => TaskKind::ImageEmbed,
            Self::ImageGenerate(_) => TaskKind::ImageGenerate,
        }
    }

    /// Shape the JSON body the target model family expects
    pub fn into_request(self, model_id: &str) -> Result<ModelRequest> {
        let family = ModelFamily::require(model_id)?;
        if family.task_kind() != self.kind() {
            return Err(InvokeError::UnsupportedTask {
                model_id: model_id.to_string(),
                task: self.kind().as_str(),
            });
        }

        let body = match self {
            Self::TextGenerate { prompt, params } => text_generation_body(family, prompt, &params),
            Self::TextEmbed { text } => json!({ "inputText": text }),
            Self::ImageEmbed { image } => json!({ "inputImage": BASE64.encode(image) }),
            Self::ImageGenerate(generation) => image_generation_body(family, model_id, generation)?,
        };

        Ok(ModelRequest::json(model_id, body))
    }
}

fn text_generation_body(family: ModelFamily, prompt: String, params: &SamplingParams) -> Value {
    match family {
        ModelFamily::Llama => {
            if !params.stop_sequences.is_empty() {
                log::debug!("Llama models take no stop sequences; ignoring {:?}", params.stop_sequences);
            }
            json!({
                "prompt": prompt,
                "max_gen_len": params.max_tokens,
                "temperature": params.temperature,
                "top_p": params.top_p,
            })
        }
        ModelFamily::CohereCommand => json!({
            "prompt": prompt,
            "temperature": params.temperature,
            "p": params.top_p,
            "k": params.top_k.unwrap_or(0),
            "max_tokens": params.max_tokens,
            "stop_sequences": params.stop_sequences,
        }),
        _ => json!({
            "inputText": prompt,
            "textGenerationConfig": {
                "maxTokenCount": params.max_tokens,
                "stopSequences": params.stop_sequences,
                "temperature": params.temperature,
                "topP": params.top_p,
            },
        }),
    }
}

fn image_generation_body(
    family: ModelFamily,
    model_id: &str,
    generation: ImageGeneration,
) -> Result<Value> {
    match (family, generation) {
        (
            ModelFamily::StableDiffusion,
            ImageGeneration::TextToImage {
                prompt,
                negative_prompt,
                style_preset,
                config,
            },
        ) => {
            let mut prompts = vec![json!({ "text": prompt })];
            if let Some(negative) = negative_prompt {
                prompts.push(json!({ "text": negative, "weight": -1.0 }));
            }
            let mut body = Map::new();
            body.insert("text_prompts".into(), Value::Array(prompts));
            body.insert("height".into(), json!(config.height));
            body.insert("width".into(), json!(config.width));
            body.insert("cfg_scale".into(), json!(config.cfg_scale));
            if let Some(style) = style_preset {
                body.insert("style_preset".into(), Value::String(style));
            }
            Ok(Value::Object(body))
        }
        (ModelFamily::StableDiffusion, ImageGeneration::Inpaint { .. }) => {
            Err(InvokeError::UnsupportedTask {
                model_id: model_id.to_string(),
                task: "inpaint",
            })
        }
        (
            _,
            ImageGeneration::TextToImage {
                prompt,
                negative_prompt,
                style_preset,
                config,
            },
        ) => {
            if style_preset.is_some() {
                log::debug!("Titan image models take no style preset; ignoring it");
            }
            let mut params = Map::new();
            params.insert("text".into(), Value::String(prompt));
            if let Some(negative) = negative_prompt {
                params.insert("negativeText".into(), Value::String(negative));
            }
            Ok(json!({
                "taskType": "TEXT_IMAGE",
                "textToImageParams": params,
                "imageGenerationConfig": titan_image_config(&config),
            }))
        }
        (
            _,
            ImageGeneration::Inpaint {
                prompt,
                negative_prompt,
                image,
                mask_prompt,
                config,
            },
        ) => {
            let mut params = Map::new();
            params.insert("text".into(), Value::String(prompt));
            if let Some(negative) = negative_prompt {
                params.insert("negativeText".into(), Value::String(negative));
            }
            params.insert("image".into(), Value::String(BASE64.encode(image)));
            params.insert("maskPrompt".into(), Value::String(mask_prompt));
            Ok(json!({
                "taskType": "INPAINTING",
                "inPaintingParams": params,
                "imageGenerationConfig": titan_image_config(&config),
            }))
        }
    }
}

fn titan_image_config(config: &ImageConfig) -> Value {
    json!({
        "numberOfImages": config.number_of_images,
        "height": config.height,
        "width": config.width,
        "cfgScale": config.cfg_scale,
    })
}
