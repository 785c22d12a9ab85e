//! Command-line surface of the `studio` binary.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "studio",
    version,
    about = "AI tools for video creators: images, video, scripts, SEO, voice-over",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Referral link or code to remember until the next sign-in
    #[arg(long = "ref", global = true, value_name = "LINK_OR_CODE")]
    pub referral: Option<String>,

    /// Also log to the terminal, at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Where generated media and the session file are stored
    #[arg(long, global = true, value_name = "DIR")]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate one to four images from a prompt
    Image(ImageArgs),
    /// Turn a script into one image per scene
    Bulk(BulkArgs),
    /// Generate a short video clip (takes minutes)
    Video(VideoArgs),
    /// Write a structured video script for a topic
    Script(ScriptArgs),
    /// Rewrite an existing script for retention
    Rewrite(ScriptSource),
    /// Produce titles, description, tags and thumbnail concepts
    Seo(SeoArgs),
    /// Synthesize a voice-over
    Speak(SpeakArgs),
    /// Find trending channels and viral videos for a niche
    Discover(DiscoverArgs),
    /// Store the profile carried by an identity token
    SignIn(SignInArgs),
    /// Forget the stored profile
    SignOut,
    /// Show the stored profile and referral code
    Whoami,
}

#[derive(Args, Debug)]
pub struct ImageArgs {
    pub prompt: String,

    /// Visual style, e.g. cinematic, anime, 3d_animation
    #[arg(long)]
    pub style: Option<String>,

    /// Things the image must not contain
    #[arg(long)]
    pub negative: Option<String>,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub count: u8,

    #[arg(long, default_value = "1:1")]
    pub aspect: String,
}

/// Script text given inline or read from a file.
#[derive(Args, Debug)]
pub struct ScriptSource {
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BulkArgs {
    #[command(flatten)]
    pub source: ScriptSource,

    #[arg(long, default_value = "cinematic")]
    pub style: String,

    #[arg(long, default_value = "16:9")]
    pub aspect: String,
}

#[derive(Args, Debug)]
pub struct VideoArgs {
    pub prompt: String,

    /// Starting frame (png, jpeg or webp)
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    #[arg(long, default_value = "16:9")]
    pub aspect: String,
}

#[derive(Args, Debug)]
pub struct ScriptArgs {
    pub topic: String,
}

#[derive(Args, Debug)]
pub struct SeoArgs {
    pub topic: String,

    #[arg(long, default_value = "")]
    pub keywords: String,

    #[arg(long, default_value = "")]
    pub channel_link: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub audience: String,

    #[arg(long, default_value = "")]
    pub emotion: String,

    /// Also render the Nth thumbnail concept (1-based)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..))]
    pub thumbnail: Option<u8>,
}

#[derive(Args, Debug)]
pub struct SpeakArgs {
    pub text: String,

    #[arg(long, default_value = "Kore")]
    pub voice: String,
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    pub query: String,
}

#[derive(Args, Debug)]
pub struct SignInArgs {
    /// Identity token issued by the sign-in provider
    #[arg(long)]
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "studio",
            "image",
            "a red fox",
            "--count",
            "3",
            "--ref",
            "partner7",
            "--output",
            "/tmp/out",
        ])
        .unwrap();
        assert_eq!(cli.referral.as_deref(), Some("partner7"));
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/out")));
        match cli.command {
            Command::Image(args) => {
                assert_eq!(args.prompt, "a red fox");
                assert_eq!(args.count, 3);
                assert_eq!(args.aspect, "1:1");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn image_count_is_bounded() {
        assert!(Cli::try_parse_from(["studio", "image", "x", "--count", "5"]).is_err());
    }
}
