#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use surround_graph::{
    Collector, Executor, InMemorySettings, Normalizer, Reconciler, SettingsStore, SinkNames, ToolError, ToolRunner,
};

pub const FILTER: &str = "input.virtual-surround-sound-filter";
pub const DEVICE: &str = "input.virtual-surround-sound-input";
pub const FALLBACK: &str = "input.virtual-sink";

/// A stateful stand-in for the audio server. Answers listing queries from
/// its model and applies move/default commands to it.
#[derive(Default)]
pub struct FakeAudioServer {
    state: Mutex<ServerState>,
    calls: Mutex<Vec<String>>,
}

#[derive(Default)]
struct ServerState {
    sinks: Vec<Value>,
    streams: Vec<Value>,
    default_sink: Option<String>,
    /// Extra plain-text listing appended after the generated one.
    plain_extra: String,
    offline: bool,
}

impl FakeAudioServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&self, sink: Value) {
        self.state.lock().unwrap().sinks.push(sink);
    }

    pub fn add_stream(&self, stream: Value) {
        self.state.lock().unwrap().streams.push(stream);
    }

    pub fn set_default(&self, name: &str) {
        self.state.lock().unwrap().default_sink = Some(name.to_string());
    }

    pub fn set_plain_extra(&self, text: &str) {
        self.state.lock().unwrap().plain_extra = text.to_string();
    }

    /// Make every invocation fail as if the tools were not installed.
    pub fn go_offline(&self) {
        self.state.lock().unwrap().offline = true;
    }

    pub fn default_sink(&self) -> Option<String> {
        self.state.lock().unwrap().default_sink.clone()
    }

    /// Sink index stream `index` currently plays to.
    pub fn sink_of(&self, index: u64) -> Option<u64> {
        let state = self.state.lock().unwrap();
        state
            .streams
            .iter()
            .find(|s| s["index"].as_u64() == Some(index))
            .and_then(|s| s["sink"].as_u64())
    }

    /// Every invocation, e.g. `pactl move-sink-input 7 9`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Only invocations that change server state.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains("set-default") || c.contains("move-sink-input") || c.contains("set-sink-volume"))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn plain_listing(state: &ServerState) -> String {
        let mut out = String::new();
        for stream in &state.streams {
            out.push_str(&format!("Sink Input #{}\n", stream["index"]));
            out.push_str(&format!("\tSink: {}\n\tProperties:\n", stream["sink"]));
            if let Some(props) = stream["properties"].as_object() {
                for (key, value) in props {
                    if let Some(v) = value.as_str() {
                        out.push_str(&format!("\t\t{} = \"{}\"\n", key, v));
                    }
                }
            }
        }
        out.push_str(&state.plain_extra);
        out
    }
}

impl ToolRunner for FakeAudioServer {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", program, args.join(" ")));

        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(ToolError::Missing {
                program: program.to_string(),
            });
        }

        let failed = |stderr: &str| ToolError::Failed {
            program: program.to_string(),
            status: "exit status: 1".to_string(),
            stderr: stderr.to_string(),
        };

        match args {
            ["-f", "json", "list", "sinks"] => Ok(Value::from(state.sinks.clone()).to_string()),
            ["-f", "json", "list", "sink-inputs"] => Ok(Value::from(state.streams.clone()).to_string()),
            ["list", "sink-inputs"] => Ok(Self::plain_listing(&state)),
            ["get-default-sink"] => state
                .default_sink
                .clone()
                .map(|name| format!("{}\n", name))
                .ok_or_else(|| failed("No default sink")),
            ["set-default", id] => {
                let name = state
                    .sinks
                    .iter()
                    .find(|s| s["properties"]["object.id"].as_str() == Some(*id))
                    .and_then(|s| s["name"].as_str())
                    .map(str::to_string)
                    .ok_or_else(|| failed("Object not found"))?;
                state.default_sink = Some(name);
                Ok(String::new())
            }
            ["move-sink-input", stream, sink] => {
                let stream: u64 = stream.parse().map_err(|_| failed("Invalid sink input index"))?;
                let sink: u64 = sink.parse().map_err(|_| failed("Invalid sink index"))?;
                let entry = state
                    .streams
                    .iter_mut()
                    .find(|s| s["index"].as_u64() == Some(stream))
                    .ok_or_else(|| failed("No such entity"))?;
                entry["sink"] = json!(sink);
                Ok(String::new())
            }
            ["set-sink-volume", ..] => Ok(String::new()),
            _ => Err(failed("unknown command")),
        }
    }
}

pub fn sink(index: u64, object_id: u64, name: &str) -> Value {
    json!({
        "index": index,
        "name": name,
        "description": name,
        "channel_map": "front-left,front-right",
        "properties": {
            "object.id": object_id.to_string(),
            "node.name": name,
        },
        "ports": []
    })
}

pub fn virtual_sink(index: u64, object_id: u64, name: &str) -> Value {
    let mut sink = sink(index, object_id, name);
    sink["properties"]["node.virtual"] = json!("true");
    sink
}

pub fn hardware_sink(index: u64, object_id: u64, name: &str, priority: i64, ports: &[&str]) -> Value {
    let mut sink = sink(index, object_id, name);
    sink["properties"]["priority.session"] = json!(priority.to_string());
    sink["ports"] = Value::from(
        ports
            .iter()
            .map(|a| json!({"name": "analog-output", "availability": a}))
            .collect::<Vec<_>>(),
    );
    sink
}

pub fn stream(index: u64, sink: u64, app: &str, binary: &str) -> Value {
    json!({
        "index": index,
        "sink": sink,
        "format": "pcm, format.sample_format = \"\\\"float32le\\\"\"  format.rate = \"48000\"  format.channels = \"2\"  format.channel_map = \"\\\"front-left,front-right\\\"\"",
        "sample_specification": "float32le 2ch 48000Hz",
        "channel_map": "front-left,front-right",
        "volume": {
            "front-left": {"value": 65536, "value_percent": "100%", "db": "0.00 dB"},
            "front-right": {"value": 65536, "value_percent": "100%", "db": "0.00 dB"}
        },
        "properties": {
            "application.name": app,
            "application.process.binary": binary,
            "media.name": "Playback"
        }
    })
}

pub fn pinned_stream(index: u64, sink: u64, app: &str, binary: &str, target: &str) -> Value {
    let mut stream = stream(index, sink, app, binary);
    stream["properties"]["target.object"] = json!(target);
    stream
}

pub struct TestFixture {
    pub server: Arc<FakeAudioServer>,
    pub settings: Arc<InMemorySettings>,
    pub reconciler: Arc<Reconciler>,
}

impl TestFixture {
    /// Empty server; add sinks and streams per test.
    pub fn empty() -> Self {
        Self::with_settings(Arc::new(InMemorySettings::new()))
    }

    pub fn with_settings(settings: Arc<InMemorySettings>) -> Self {
        let server = Arc::new(FakeAudioServer::new());
        let reconciler = Arc::new(reconciler_for(server.clone(), settings.clone()));
        Self {
            server,
            settings,
            reconciler,
        }
    }

    /// A typical desktop: the three surround-plugin sinks, speakers, and an
    /// unplugged HDMI output. Speakers are the current default.
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture.server.add_sink(virtual_sink(57, 90, FILTER));
        fixture.server.add_sink(virtual_sink(58, 91, DEVICE));
        fixture.server.add_sink(virtual_sink(50, 60, FALLBACK));
        fixture
            .server
            .add_sink(hardware_sink(41, 40, "alsa_output.pci-analog-stereo", 1000, &["available"]));
        fixture.server.add_sink(hardware_sink(
            43,
            42,
            "alsa_output.pci-hdmi-stereo",
            1200,
            &["not available"],
        ));
        fixture.server.set_default("alsa_output.pci-analog-stereo");
        fixture
    }

    pub fn set_surround_default(&self, enabled: bool) {
        self.settings
            .set(surround_graph::settings::SURROUND_SINK_DEFAULT, Value::Bool(enabled))
            .unwrap();
    }

    pub fn enable(&self, app: &str) {
        self.reconciler.enable_app(app).unwrap();
    }
}

pub fn reconciler_for(runner: Arc<dyn ToolRunner>, settings: Arc<dyn SettingsStore>) -> Reconciler {
    Reconciler::new(
        Collector::new(runner.clone(), "pactl", Normalizer::new(["steamwebhelper"])),
        Executor::new(runner, "pactl", "wpctl"),
        settings,
        SinkNames::new(FILTER, DEVICE, FALLBACK),
    )
}
