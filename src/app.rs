use generation_provider::{
    ExecutionResult, FragmentSnapshot, GenerationEndpoint, GenerationRequest, LlmModel,
    LlmModelConfig, SandboxRequest,
};

pub use generation_provider::RunId;

use crate::chat::{
    apply_snapshot, attach_result, inject_context, to_request_messages, ContentPart, Message,
    MessageHistory, Role,
};
use crate::config::EnvConfig;
use crate::models::{ModelCatalog, TemplateCatalog, TemplateSelection};
use crate::persist::PersistedState;
use crate::selection::{
    AttachmentState, CapturedSelection, IngestOutcome, InteractionMode, DEFAULT_MAX_SELECTION_CHARS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Generating { run_id: RunId },
    Error(String),
}

/// Which pane of the preview is in front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Code,
    Fragment,
}

/// Signed-in identity forwarded to the generation and sandbox services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub team_id: Option<String>,
}

pub trait HostOps {
    /// Starts a generation. The host assigns the run id.
    fn start_generation(&mut self, request: GenerationRequest) -> Result<RunId, String>;
    fn cancel_generation(&mut self, run_id: RunId);
    /// Provisions a sandbox for the fragment produced by `run_id`.
    fn provision_sandbox(&mut self, run_id: RunId, request: SandboxRequest);
    fn request_auth(&mut self);
    fn request_render(&mut self);
}

const RATE_LIMIT_MARKER: &str = "limit";
const ERROR_NO_MODEL: &str = "No language model available";

#[derive(Debug, Clone)]
pub struct App {
    pub mode: Mode,
    pub input: String,
    /// Pending image attachments as data URLs.
    pub files: Vec<String>,
    pub history: MessageHistory,
    pub attachment: AttachmentState,
    pub fragment: Option<FragmentSnapshot>,
    pub result: Option<ExecutionResult>,
    pub current_tab: Tab,
    pub preview_loading: bool,
    pub rate_limited: bool,
    pub error_message: Option<String>,
    pub template: TemplateSelection,
    pub language_model: LlmModelConfig,
    pub use_morph_apply: bool,
    pub session: Option<Session>,
    models: ModelCatalog,
    templates: TemplateCatalog,
    pending_sandbox: Option<RunId>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self::with_catalogs(
            ModelCatalog::builtin(),
            TemplateCatalog::builtin(),
            AttachmentState::new(DEFAULT_MAX_SELECTION_CHARS, false),
        )
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        let models = if config.hide_local_models {
            ModelCatalog::builtin().without_local()
        } else {
            ModelCatalog::builtin()
        };

        let mut app = Self::with_catalogs(
            models,
            TemplateCatalog::builtin(),
            AttachmentState::new(config.max_selection_chars, config.auto_attach),
        );
        app.use_morph_apply = config.use_morph_apply;
        app
    }

    pub fn with_catalogs(
        models: ModelCatalog,
        templates: TemplateCatalog,
        attachment: AttachmentState,
    ) -> Self {
        let mut language_model = LlmModelConfig::default();
        models.normalize_config(&mut language_model);

        Self {
            mode: Mode::Idle,
            input: String::new(),
            files: Vec::new(),
            history: MessageHistory::new(),
            attachment,
            fragment: None,
            result: None,
            current_tab: Tab::Code,
            preview_loading: false,
            rate_limited: false,
            error_message: None,
            template: TemplateSelection::Auto,
            language_model,
            use_morph_apply: false,
            session: None,
            models,
            templates,
            pending_sandbox: None,
        }
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn current_model(&self) -> Option<&LlmModel> {
        self.models.current(&self.language_model)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.mode, Mode::Generating { .. })
    }

    pub fn can_clear(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.history.len() > 1 && !self.is_loading()
    }

    pub fn interaction_mode(&self) -> InteractionMode {
        if self.attachment.auto_attach() {
            InteractionMode::Auto
        } else {
            InteractionMode::Menu
        }
    }

    /// The alternate apply route is used only when the current fragment can be
    /// patched in place.
    pub fn generation_endpoint(&self) -> GenerationEndpoint {
        let patchable = self
            .fragment
            .as_ref()
            .is_some_and(FragmentSnapshot::is_patchable);
        if self.use_morph_apply && patchable {
            GenerationEndpoint::MorphChat
        } else {
            GenerationEndpoint::Chat
        }
    }

    pub fn on_input_replace(&mut self, text: String) {
        self.input = text;
    }

    pub fn on_files_replace(&mut self, files: Vec<String>) {
        self.files = files;
    }

    pub fn on_submit(&mut self, host: &mut dyn HostOps) {
        if self.session.is_none() {
            host.request_auth();
            host.request_render();
            return;
        }

        if self.input.trim().is_empty() && self.files.is_empty() {
            host.request_render();
            return;
        }

        self.halt_active_generation(host);

        let mut content = vec![ContentPart::text(self.input.clone())];
        if self.current_model().is_some_and(|model| model.multi_modal) {
            content.extend(
                self.files
                    .iter()
                    .map(|image| ContentPart::Image {
                        image: image.clone(),
                    }),
            );
        }
        self.history.append(Message::user(content));

        self.dispatch(host);

        self.input.clear();
        self.files.clear();
        self.current_tab = Tab::Code;
        host.request_render();
    }

    /// Re-sends the current history with the current settings.
    pub fn on_retry(&mut self, host: &mut dyn HostOps) {
        if self.session.is_none() {
            host.request_auth();
            host.request_render();
            return;
        }

        self.halt_active_generation(host);
        self.dispatch(host);
        host.request_render();
    }

    pub fn on_stop(&mut self, host: &mut dyn HostOps) {
        self.halt_active_generation(host);
        host.request_render();
    }

    pub fn on_undo(&mut self, host: &mut dyn HostOps) {
        if !self.can_undo() {
            host.request_render();
            return;
        }

        self.history.undo_last_turn();
        self.set_current_preview(None, None);
        self.pending_sandbox = None;
        self.preview_loading = false;
        host.request_render();
    }

    pub fn on_clear_chat(&mut self, host: &mut dyn HostOps) {
        self.halt_active_generation(host);
        self.input.clear();
        self.files.clear();
        self.history.clear();
        self.set_current_preview(None, None);
        self.pending_sandbox = None;
        self.current_tab = Tab::Code;
        self.preview_loading = false;
        self.attachment.clear();
        host.request_render();
    }

    pub fn set_current_preview(
        &mut self,
        fragment: Option<FragmentSnapshot>,
        result: Option<ExecutionResult>,
    ) {
        self.fragment = fragment;
        self.result = result;
    }

    pub fn on_code_selection(&mut self, selection: CapturedSelection) -> IngestOutcome {
        self.attachment.ingest(selection)
    }

    pub fn on_attach_pending(&mut self) -> IngestOutcome {
        self.attachment.confirm()
    }

    pub fn on_dismiss_pending(&mut self) {
        self.attachment.dismiss();
    }

    pub fn on_clear_attached_context(&mut self) {
        self.attachment.clear();
    }

    pub fn set_auto_attach(&mut self, enabled: bool) {
        self.attachment.set_auto_attach(enabled);
    }

    pub fn set_use_morph_apply(&mut self, enabled: bool) {
        self.use_morph_apply = enabled;
    }

    pub fn set_template(&mut self, template: TemplateSelection) {
        self.template = template;
    }

    pub fn set_session(&mut self, session: Option<Session>) {
        self.session = session;
    }

    /// Merges a settings update into the model config.
    pub fn on_language_model_change(&mut self, update: LlmModelConfig) {
        self.language_model.merge(update);
        self.models.normalize_config(&mut self.language_model);
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            chat: self.input.clone(),
            language_model: self.language_model.clone(),
            auto_attach_selection: self.attachment.auto_attach(),
            use_morph_apply: self.use_morph_apply,
        }
    }

    pub fn apply_persisted_state(&mut self, state: PersistedState) {
        self.input = state.chat;
        self.language_model = state.language_model;
        self.models.normalize_config(&mut self.language_model);
        self.attachment.set_auto_attach(state.auto_attach_selection);
        self.use_morph_apply = state.use_morph_apply;
    }

    pub fn on_generation_started(&mut self, run_id: RunId) {
        if !self.is_active_run(run_id) {
            return;
        }

        tracing::debug!(run_id, "generation started");
    }

    pub fn on_generation_snapshot(&mut self, run_id: RunId, snapshot: FragmentSnapshot) {
        if !self.is_active_run(run_id) {
            return;
        }

        apply_snapshot(&mut self.history, &snapshot);
        self.fragment = Some(snapshot);
    }

    pub fn on_generation_finished(
        &mut self,
        run_id: RunId,
        object: FragmentSnapshot,
        host: &mut dyn HostOps,
    ) {
        if !self.is_active_run(run_id) {
            return;
        }

        // The final object only refreshes the streamed assistant message; a
        // stream that sent no snapshots leaves the history as it was.
        let streamed_reply = self
            .history
            .last()
            .is_some_and(|message| message.role == Role::Assistant);
        if streamed_reply && self.fragment.as_ref() != Some(&object) {
            apply_snapshot(&mut self.history, &object);
        }
        self.fragment = Some(object.clone());
        self.mode = Mode::Idle;
        self.rate_limited = false;
        tracing::info!(run_id, template = ?object.template, "generation finished");

        self.preview_loading = true;
        self.pending_sandbox = Some(run_id);
        let session = self.session.as_ref();
        host.provision_sandbox(
            run_id,
            SandboxRequest {
                fragment: object,
                user_id: session.map(|session| session.user_id.clone()),
                team_id: session.and_then(|session| session.team_id.clone()),
                access_token: session.map(|session| session.access_token.clone()),
            },
        );
    }

    pub fn on_generation_failed(&mut self, run_id: RunId, error: &str) {
        if !self.is_active_run(run_id) {
            return;
        }

        if error.contains(RATE_LIMIT_MARKER) {
            self.rate_limited = true;
        }
        tracing::warn!(run_id, rate_limited = self.rate_limited, "generation failed: {error}");
        self.mode = Mode::Error(error.to_string());
        self.error_message = Some(error.to_string());
    }

    pub fn on_generation_cancelled(&mut self, run_id: RunId) {
        if !self.is_active_run(run_id) {
            return;
        }

        self.mode = Mode::Idle;
    }

    pub fn on_sandbox_ready(&mut self, run_id: RunId, result: ExecutionResult) {
        if self.pending_sandbox != Some(run_id) {
            return;
        }

        tracing::info!(run_id, url = ?result.url, "sandbox ready");
        self.pending_sandbox = None;
        attach_result(&mut self.history, result.clone());
        let fragment = self.fragment.take();
        self.set_current_preview(fragment, Some(result));
        self.current_tab = Tab::Fragment;
        self.preview_loading = false;
    }

    pub fn on_sandbox_failed(&mut self, run_id: RunId, error: &str) {
        if self.pending_sandbox != Some(run_id) {
            return;
        }

        tracing::warn!(run_id, "sandbox provisioning failed: {error}");
        self.pending_sandbox = None;
        self.error_message = Some(format!("Sandbox provisioning failed: {error}"));
        self.preview_loading = false;
    }

    fn dispatch(&mut self, host: &mut dyn HostOps) {
        let Some(session) = self.session.clone() else {
            host.request_auth();
            return;
        };
        let Some(model) = self.current_model().cloned() else {
            self.mode = Mode::Error(ERROR_NO_MODEL.to_string());
            self.error_message = Some(ERROR_NO_MODEL.to_string());
            return;
        };

        let endpoint = self.generation_endpoint();
        let attached = self.attachment.attached();
        let request = GenerationRequest {
            run_id: 0,
            endpoint,
            user_id: session.user_id,
            team_id: session.team_id,
            messages: inject_context(to_request_messages(self.history.messages()), attached),
            template: self.templates.select(&self.template),
            model,
            config: self.language_model.clone(),
            context: attached.map(|context| context.code.clone()),
            context_meta: attached.and_then(|context| context.meta),
            current_fragment: match endpoint {
                GenerationEndpoint::MorphChat => self.fragment.clone(),
                GenerationEndpoint::Chat => None,
            },
        };

        if self.pending_sandbox.take().is_some() {
            self.preview_loading = false;
        }
        self.error_message = None;

        match host.start_generation(request) {
            Ok(run_id) => {
                tracing::info!(run_id, ?endpoint, "generation dispatched");
                self.mode = Mode::Generating { run_id };
            }
            Err(error) => {
                let message = format!("Failed to start generation: {error}");
                self.mode = Mode::Error(message.clone());
                self.error_message = Some(message);
            }
        }
    }

    fn halt_active_generation(&mut self, host: &mut dyn HostOps) {
        if let Mode::Generating { run_id } = self.mode {
            tracing::debug!(run_id, "halting generation");
            self.mode = Mode::Idle;
            host.cancel_generation(run_id);
        }
    }

    fn is_active_run(&self, run_id: RunId) -> bool {
        matches!(self.mode, Mode::Generating { run_id: current } if current == run_id)
    }
}
