use std::fs;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use engine_logging::{engine_debug, engine_info};
use studio_core::{update, AppState, JobSpec, Msg, Profile, SeoBrief, ToolKind, ToolStatus};
use studio_engine::{affiliate_id, decode_identity_token, EngineConfig};

use super::effects::EffectRunner;
use super::persistence::load_session;
use super::ui::render::Renderer;
use crate::cli::{Cli, Command, ScriptSource};

const ENGINE_POLL: Duration = Duration::from_millis(250);

pub(crate) fn run_app(cli: Cli) -> Result<ExitCode> {
    let mut config = EngineConfig::from_env();
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    engine_info!("Output directory {:?}", config.output_dir);

    let stored = load_session(&config.output_dir);
    let client_id = config.credentials.require_client_id().map(str::to_owned);
    let mut app = App::new(EffectRunner::new(config));
    app.dispatch(Msg::SessionRestored {
        profile: stored.profile,
        referral: stored.referral,
    });
    if let Some(referral) = cli.referral {
        app.dispatch(Msg::ReferralCaptured(referral));
    }

    let mut follow_up = None;
    let first = match cli.command {
        Command::SignIn(args) => {
            client_id.context("sign-in is not configured")?;
            let identity = decode_identity_token(&args.token).context("invalid identity token")?;
            Msg::SignedIn(Profile {
                id: identity.id,
                name: identity.name,
                email: identity.email,
                avatar: identity.avatar,
            })
        }
        Command::SignOut => Msg::SignedOut,
        Command::Whoami => Msg::NoOp,
        Command::Image(args) => Msg::ToolRequested(JobSpec::Images {
            prompt: args.prompt,
            style: args.style,
            negative_prompt: args.negative,
            count: args.count,
            aspect_ratio: args.aspect,
        }),
        Command::Bulk(args) => Msg::ToolRequested(JobSpec::Bulk {
            script: read_source(args.source)?,
            style: args.style,
            aspect_ratio: args.aspect,
        }),
        Command::Video(args) => Msg::ToolRequested(JobSpec::Video {
            prompt: args.prompt,
            seed_image: args.image.map(|path| path.display().to_string()),
            aspect_ratio: args.aspect,
        }),
        Command::Script(args) => Msg::ToolRequested(JobSpec::Script { topic: args.topic }),
        Command::Rewrite(source) => Msg::ToolRequested(JobSpec::Rewrite {
            script: read_source(source)?,
        }),
        Command::Seo(args) => {
            follow_up = args.thumbnail.map(|n| usize::from(n) - 1);
            Msg::ToolRequested(JobSpec::Seo(SeoBrief {
                topic: args.topic,
                keywords: args.keywords,
                channel_link: args.channel_link,
                business_email: args.email,
                target_audience: args.audience,
                desired_emotion: args.emotion,
            }))
        }
        Command::Speak(args) => Msg::ToolRequested(JobSpec::Speech {
            text: args.text,
            voice: args.voice,
        }),
        Command::Discover(args) => Msg::ToolRequested(JobSpec::Discovery { query: args.query }),
    };
    let show_session = matches!(first, Msg::NoOp | Msg::SignedIn(_) | Msg::SignedOut);
    app.dispatch(first);
    app.run_until_idle();

    if let Some(index) = follow_up {
        if app.status(ToolKind::Seo) == Some(ToolStatus::Done) {
            app.dispatch(Msg::FollowUpRequested { index });
            app.run_until_idle();
        }
    }

    if show_session {
        app.print_session();
    }
    Ok(app.exit_code())
}

fn read_source(source: ScriptSource) -> Result<String> {
    match (source.text, source.file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => {
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
        }
        (None, None) => bail!("give the script inline or with --file"),
    }
}

struct App {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
}

impl App {
    fn new(runner: EffectRunner) -> Self {
        Self {
            state: AppState::new(),
            runner,
            renderer: Renderer::new(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let mut inbox = vec![msg];
        while let Some(msg) = inbox.pop() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            inbox.extend(self.runner.apply(effects));
        }
        self.render_if_dirty();
    }

    /// Pumps engine events until no request is running.
    fn run_until_idle(&mut self) {
        while self.state.running_count() > 0 {
            for msg in self.runner.poll(ENGINE_POLL) {
                self.dispatch(msg);
            }
            engine_debug!("{} request(s) running", self.state.running_count());
        }
    }

    fn render_if_dirty(&mut self) {
        if !self.state.consume_dirty() {
            return;
        }
        for line in self.renderer.render(&self.state.view()) {
            println!("{line}");
        }
    }

    fn status(&self, tool: ToolKind) -> Option<ToolStatus> {
        self.state.view().tool(tool).map(|view| view.status)
    }

    fn print_session(&self) {
        let view = self.state.view();
        match &view.session.profile {
            Some(profile) => {
                println!("Signed in as {} <{}>", profile.name, profile.email);
                println!("Your referral code: {}", affiliate_id(&profile.email));
            }
            None => println!("Not signed in"),
        }
        if let Some(referral) = &view.session.referral {
            println!("Pending referral code: {referral}");
        }
        println!(
            "Output directory: {}",
            self.runner.output_dir().display()
        );
    }

    fn exit_code(&self) -> ExitCode {
        let view = self.state.view();
        let failed = view.notice.is_some()
            || view
                .tools
                .iter()
                .any(|tool| tool.status == ToolStatus::Failed);
        if failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}
