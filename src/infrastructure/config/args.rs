use super::app_config::{Environment, LogLevel};
use crate::domain::entities::{FitMode, ImageFormat, OptimizationOptions};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "verisite",
    version,
    about = "Image delivery and lead-capture tooling for the Verisite site",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Deployment environment.
    #[arg(long, value_enum, global = true)]
    pub environment: Option<Environment>,

    /// API base URL. Takes precedence over `VERISITE_API_URL` and the config file.
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Origin for same-origin image paths.
    #[arg(long, value_name = "URL", global = true)]
    pub site_origin: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the optimized URL for an image.
    Optimize {
        /// Image source URL or path.
        src: String,
        #[command(flatten)]
        image: ImageArgs,
        /// Print a srcset for these comma-separated widths instead.
        #[arg(long, value_delimiter = ',')]
        srcset: Vec<u32>,
    },
    /// Fetch images ahead of time and report each outcome.
    Preload {
        /// Image source URLs or paths.
        #[arg(required = true)]
        urls: Vec<String>,
        #[command(flatten)]
        image: ImageArgs,
        /// Use the above-the-fold preset.
        #[arg(long)]
        critical: bool,
    },
    /// Load a single image with a short timeout and report the result.
    Check {
        /// Image source URL or path.
        src: String,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Check that the form API is reachable.
    Health,
    /// Submit the contact form.
    Contact(ContactArgs),
    /// Submit a partnership enquiry.
    Partnership(PartnershipArgs),
    /// Subscribe to the newsletter.
    Newsletter(NewsletterArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct ImageArgs {
    /// Target width in pixels.
    #[arg(long)]
    pub width: Option<u32>,
    /// Target height in pixels.
    #[arg(long)]
    pub height: Option<u32>,
    /// Quality, clamped to 1-100.
    #[arg(long, allow_negative_numbers = true)]
    pub quality: Option<i32>,
    /// Output format (webp, jpg, png, auto).
    #[arg(long)]
    pub format: Option<ImageFormat>,
    /// Fit mode (crop, fill, scale, max, clip).
    #[arg(long)]
    pub fit: Option<FitMode>,
    /// Blur radius.
    #[arg(long)]
    pub blur: Option<u32>,
}

impl From<&ImageArgs> for OptimizationOptions {
    fn from(args: &ImageArgs) -> Self {
        Self {
            width: args.width,
            height: args.height,
            quality: args.quality,
            format: args.format,
            fit: args.fit,
            blur: args.blur,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ContactArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub service: Option<String>,
    #[arg(long)]
    pub message: String,
    /// Pre-solved CAPTCHA token.
    #[arg(long, env = "VERISITE_CAPTCHA_TOKEN")]
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PartnershipArgs {
    #[arg(long)]
    pub company_name: String,
    #[arg(long)]
    pub contact_name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub website: Option<String>,
    #[arg(long)]
    pub partnership_type: String,
    #[arg(long)]
    pub message: String,
    /// Pre-solved CAPTCHA token.
    #[arg(long, env = "VERISITE_CAPTCHA_TOKEN")]
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct NewsletterArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub name: Option<String>,
    /// Pre-solved CAPTCHA token.
    #[arg(long, env = "VERISITE_CAPTCHA_TOKEN")]
    pub captcha_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optimize() {
        let args = CliArgs::try_parse_from([
            "verisite",
            "optimize",
            "https://images.unsplash.com/photo-1",
            "--width",
            "400",
            "--quality",
            "-5",
            "--format",
            "webp",
            "--fit",
            "crop",
        ])
        .unwrap();

        let Command::Optimize { src, image, srcset } = args.command else {
            panic!("expected optimize");
        };
        assert_eq!(src, "https://images.unsplash.com/photo-1");
        assert!(srcset.is_empty());

        let options = OptimizationOptions::from(&image);
        assert_eq!(options.width, Some(400));
        assert_eq!(options.quality, Some(-5));
        assert_eq!(options.format, Some(ImageFormat::Webp));
        assert_eq!(options.fit, Some(FitMode::Crop));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "verisite",
            "health",
            "--environment",
            "production",
            "--api-url",
            "http://localhost:9999/api",
        ])
        .unwrap();

        assert!(matches!(args.command, Command::Health));
        assert_eq!(args.environment, Some(Environment::Production));
        assert_eq!(args.api_url.as_deref(), Some("http://localhost:9999/api"));
    }

    #[test]
    fn test_parse_check() {
        let args =
            CliArgs::try_parse_from(["verisite", "check", "/images/hero.jpg", "--width", "640"])
                .unwrap();

        let Command::Check { src, image } = args.command else {
            panic!("expected check");
        };
        assert_eq!(src, "/images/hero.jpg");
        assert_eq!(image.width, Some(640));
    }

    #[test]
    fn test_preload_requires_urls() {
        assert!(CliArgs::try_parse_from(["verisite", "preload"]).is_err());
    }
}
