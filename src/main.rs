use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use verisite::application::services::{CaptchaService, FormService, QueryClient};
use verisite::domain::entities::{
    ContactSubmission, NewsletterSubscription, OptimizationOptions, PartnershipSubmission,
    SubmissionReceipt,
};
use verisite::domain::errors::SubmissionError;
use verisite::domain::ports::{CaptchaWidgetPort, FormSubmissionPort};
use verisite::infrastructure::config::{ContactArgs, NewsletterArgs, PartnershipArgs};
use verisite::query_key;
use verisite::infrastructure::{
    AppConfig, CliArgs, Command, EncoderFormatProbe, HttpFormClient, HttpImageFetcher,
    ImageOptimizationService, ImagePreloader, ProvidedTokenWidget, StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn image_services(config: &AppConfig) -> Result<Arc<ImageOptimizationService>> {
    let site_origin = config
        .images
        .site_origin
        .as_deref()
        .map(Url::parse)
        .transpose()
        .wrap_err("invalid site origin")?;

    let fetcher = Arc::new(HttpImageFetcher::new(
        site_origin,
        config.images.fetch_timeout(),
    )?);

    Ok(Arc::new(ImageOptimizationService::with_config(
        fetcher,
        Arc::new(EncoderFormatProbe::new()),
        config.images.optimizer_config(),
    )))
}

struct Forms {
    forms: FormService,
    captcha: CaptchaService,
}

impl Forms {
    fn new(config: &AppConfig, api_url: Option<&str>, captcha_token: Option<String>) -> Result<Self> {
        let base_url = api_url.map_or_else(|| config.api_base_url(), str::to_string);
        info!(base_url = %base_url, environment = %config.environment, "Using form API");

        let client: Arc<dyn FormSubmissionPort> = Arc::new(HttpFormClient::new(base_url)?);
        let widget = ProvidedTokenWidget::from_option(captcha_token)
            .map(|w| Arc::new(w) as Arc<dyn CaptchaWidgetPort>);

        let mut captcha = CaptchaService::new(widget);
        if config.api.verify_captcha {
            captcha = captcha.with_verifier(client.clone());
        }

        Ok(Self {
            forms: FormService::new(client).with_timeouts(config.api.timeouts()),
            captcha,
        })
    }
}

fn report(result: Result<SubmissionReceipt, SubmissionError>) -> Result<()> {
    match result {
        Ok(receipt) => {
            let message = receipt.message.as_deref().unwrap_or("Submitted");
            match receipt.id {
                Some(id) => println!("{message} (reference {id})"),
                None => println!("{message}"),
            }
            Ok(())
        }
        Err(e) => bail!("{} [{}]", e.user_message(), e.code()),
    }
}

async fn contact(forms: &Forms, args: ContactArgs) -> Result<()> {
    let captcha_token = match forms.captcha.token_for_submission("contact_form").await {
        Ok(token) => token,
        Err(e) => return report(Err(e)),
    };
    let submission = ContactSubmission {
        name: args.name,
        email: args.email,
        company: args.company,
        phone: args.phone,
        service: args.service,
        message: args.message,
        captcha_token,
    };
    report(forms.forms.submit_contact(&submission).await)
}

async fn partnership(forms: &Forms, args: PartnershipArgs) -> Result<()> {
    let captcha_token = match forms.captcha.token_for_submission("partnership_form").await {
        Ok(token) => token,
        Err(e) => return report(Err(e)),
    };
    let submission = PartnershipSubmission {
        company_name: args.company_name,
        contact_name: args.contact_name,
        email: args.email,
        phone: args.phone,
        website: args.website,
        partnership_type: args.partnership_type,
        message: args.message,
        captcha_token,
    };
    report(forms.forms.submit_partnership(&submission).await)
}

async fn newsletter(forms: &Forms, args: NewsletterArgs) -> Result<()> {
    let captcha_token = match forms.captcha.token_for_submission("newsletter_signup").await {
        Ok(token) => token,
        Err(e) => return report(Err(e)),
    };
    let subscription = NewsletterSubscription {
        email: args.email,
        name: args.name,
        captcha_token,
    };
    report(forms.forms.subscribe_newsletter(&subscription).await)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = verisite::VERSION, "Starting {}", verisite::NAME);

    let api_url = args.api_url.as_deref();

    match args.command {
        Command::Optimize { ref src, ref image, ref srcset } => {
            let optimizer = image_services(&config)?;
            let options = OptimizationOptions::from(image);
            if srcset.is_empty() {
                println!("{}", optimizer.optimize(src, &options));
            } else {
                println!("{}", optimizer.responsive_src_set(src, srcset, &options));
            }
        }
        Command::Preload {
            ref urls,
            ref image,
            critical,
        } => {
            let preloader = ImagePreloader::new(image_services(&config)?);
            let batch = if critical {
                preloader.preload_critical(urls.as_slice()).await
            } else {
                preloader
                    .preload_batch(urls.as_slice(), &OptimizationOptions::from(image))
                    .await
            };

            for outcome in &batch.outcomes {
                match &outcome.result {
                    Ok(()) => println!("loaded  {}", outcome.url),
                    Err(e) => println!("failed  {} ({e})", outcome.url),
                }
            }
            println!(
                "{} settled, {} loaded, {} failed",
                batch.settled(),
                batch.loaded(),
                batch.failures().count()
            );
        }
        Command::Check { ref src, ref image } => {
            let optimizer = image_services(&config)?;
            let outcome = optimizer
                .check_load(src, &OptimizationOptions::from(image))
                .await;
            match outcome.result {
                Ok(()) => println!("loaded  {}", outcome.url),
                Err(e) => bail!("failed to load {}: {e}", outcome.url),
            }
        }
        Command::Health => {
            let forms = Forms::new(&config, api_url, None)?;
            let queries = QueryClient::new(config.query.query_options());
            let service = &forms.forms;
            let checked = queries
                .fetch_query(&query_key!["health"], || async move {
                    if service.health_check().await {
                        Ok(())
                    } else {
                        Err("form API reported unhealthy")
                    }
                })
                .await;
            match checked {
                Ok(()) => println!("healthy"),
                Err(e) => bail!("form API is not healthy: {e}"),
            }
        }
        Command::Contact(ref contact_args) => {
            let forms = Forms::new(&config, api_url, contact_args.captcha_token.clone())?;
            contact(&forms, contact_args.clone()).await?;
        }
        Command::Partnership(ref partnership_args) => {
            let forms = Forms::new(&config, api_url, partnership_args.captcha_token.clone())?;
            partnership(&forms, partnership_args.clone()).await?;
        }
        Command::Newsletter(ref newsletter_args) => {
            let forms = Forms::new(&config, api_url, newsletter_args.captcha_token.clone())?;
            newsletter(&forms, newsletter_args.clone()).await?;
        }
    }

    Ok(())
}
