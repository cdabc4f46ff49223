//! Request payloads.
//!
//! Every struct serializes to the `data` object of its request. Field
//! defaults follow the remote application's own documented defaults, so
//! callers only spell out what they want to change:
//!
//! ```
//! use vts_link::protocol::requests::MoveModelRequest;
//!
//! let req = MoveModelRequest { position_x: 0.5, ..MoveModelRequest::default() };
//! assert_eq!(req.size, -50.0);
//! ```

use serde::Serialize;

/// `AuthenticationRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRequest {
    /// Plugin name.
    pub plugin_name: String,
    /// Plugin developer.
    pub plugin_developer: String,
    /// Token previously issued by the remote application.
    pub authentication_token: String,
}

/// `AuthenticationTokenRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationTokenRequest {
    /// Plugin name.
    pub plugin_name: String,
    /// Plugin developer.
    pub plugin_developer: String,
}

/// `ParameterValueRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterValueRequest {
    /// Parameter name.
    pub name: String,
}

impl ParameterValueRequest {
    /// Requests the value of `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// How injected values combine with tracked values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionMode {
    /// Overwrite the value.
    #[default]
    Set,
    /// Add to the value.
    Add,
}

/// A single injected parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterValue {
    /// Parameter identifier.
    pub id: String,
    /// Value to inject.
    pub value: f64,
    /// Blend weight in `[0, 1]`; omitted when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// `InjectParameterDataRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectParameterDataRequest {
    /// Whether a face is considered found.
    pub face_found: bool,
    /// Combination mode.
    pub mode: InjectionMode,
    /// Values to inject.
    pub parameter_values: Vec<ParameterValue>,
}

impl InjectParameterDataRequest {
    /// Injects a single value with `mode: set` and `faceFound: true`.
    #[must_use]
    pub fn new(parameter: impl Into<String>, value: f64) -> Self {
        Self {
            face_found: true,
            mode: InjectionMode::Set,
            parameter_values: vec![ParameterValue {
                id: parameter.into(),
                value,
                weight: None,
            }],
        }
    }

    /// Sets the combination mode.
    #[must_use]
    pub fn mode(mut self, mode: InjectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets `faceFound`.
    #[must_use]
    pub fn face_found(mut self, face_found: bool) -> Self {
        self.face_found = face_found;
        self
    }
}

/// `ItemListRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemListRequest {
    /// Include free order slots.
    pub include_available_spots: bool,
    /// Include items currently in the scene.
    pub include_item_instances_in_scene: bool,
    /// Include item files available on disk.
    pub include_available_item_files: bool,
    /// Filter by file name; empty disables the filter.
    pub only_items_with_file_name: String,
    /// Filter by instance id; empty disables the filter.
    #[serde(rename = "onlyItemsWithInstanceID")]
    pub only_items_with_instance_id: String,
}

impl Default for ItemListRequest {
    fn default() -> Self {
        Self {
            include_available_spots: false,
            include_item_instances_in_scene: true,
            include_available_item_files: false,
            only_items_with_file_name: String::new(),
            only_items_with_instance_id: String::new(),
        }
    }
}

/// `ItemLoadRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLoadRequest {
    /// Item file name.
    pub file_name: String,
    /// Horizontal position.
    pub position_x: f64,
    /// Vertical position.
    pub position_y: f64,
    /// Item size.
    pub size: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Fade-in duration in seconds.
    pub fade_time: f64,
    /// Layer order.
    pub order: i32,
    /// Fail instead of picking another slot when `order` is taken.
    pub fail_if_order_taken: bool,
    /// Movement smoothing.
    pub smoothing: f64,
    /// Render censored.
    pub censored: bool,
    /// Render flipped.
    pub flipped: bool,
    /// Lock the item in place.
    pub locked: bool,
    /// Remove the item when this plugin disconnects.
    pub unload_when_plugin_disconnects: bool,
    /// Base64 custom item data.
    pub custom_data_base64: String,
    /// Ask the user before loading custom data.
    pub custom_data_ask_user_first: bool,
    /// Skip the prompt for whitelisted data.
    pub custom_data_skip_asking_user_if_whitelisted: bool,
    /// Prompt timeout in seconds; `-1` waits forever.
    pub custom_data_ask_timer: f64,
}

impl ItemLoadRequest {
    /// Loads `file_name` with every other field at its default.
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            position_x: 0.0,
            position_y: 0.0,
            size: 0.0,
            rotation: 0.0,
            fade_time: 0.5,
            order: 1,
            fail_if_order_taken: false,
            smoothing: 0.0,
            censored: false,
            flipped: false,
            locked: false,
            unload_when_plugin_disconnects: true,
            custom_data_base64: String::new(),
            custom_data_ask_user_first: true,
            custom_data_skip_asking_user_if_whitelisted: true,
            custom_data_ask_timer: -1.0,
        }
    }
}

/// `ItemUnloadRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUnloadRequest {
    /// Unload everything in the scene.
    pub unload_all_in_scene: bool,
    /// Unload everything this plugin loaded.
    pub unload_all_loaded_by_this_plugin: bool,
    /// Permit unloading items owned by the user or other plugins.
    pub allow_unloading_items_loaded_by_user_or_other_plugins: bool,
    /// Instance ids to unload.
    #[serde(rename = "instanceIDs")]
    pub instance_ids: Vec<String>,
}

impl ItemUnloadRequest {
    /// Unloads the given instances.
    #[must_use]
    pub fn new(instance_ids: Vec<String>) -> Self {
        Self {
            unload_all_in_scene: false,
            unload_all_loaded_by_this_plugin: false,
            allow_unloading_items_loaded_by_user_or_other_plugins: true,
            instance_ids,
        }
    }
}

/// `MoveModelRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveModelRequest {
    /// Animation duration.
    pub time_in_seconds: f64,
    /// Interpret values as offsets from the current transform.
    pub values_are_relative_to_model: bool,
    /// Horizontal position.
    pub position_x: f64,
    /// Vertical position.
    pub position_y: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Model size.
    pub size: f64,
}

impl Default for MoveModelRequest {
    fn default() -> Self {
        Self {
            time_in_seconds: 0.2,
            values_are_relative_to_model: false,
            position_x: 0.0,
            position_y: 0.0,
            rotation: 0.0,
            size: -50.0,
        }
    }
}

/// Mesh anchor for [`ItemPinRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinInfo {
    /// Model the mesh belongs to.
    #[serde(rename = "modelID")]
    pub model_id: String,
    /// Art mesh to pin to.
    #[serde(rename = "artMeshID")]
    pub art_mesh_id: String,
    /// Item angle.
    pub angle: f64,
    /// Item size.
    pub size: f64,
    /// First triangle vertex.
    #[serde(rename = "vertexID1")]
    pub vertex_id1: i64,
    /// Second triangle vertex.
    #[serde(rename = "vertexID2")]
    pub vertex_id2: i64,
    /// Third triangle vertex.
    #[serde(rename = "vertexID3")]
    pub vertex_id3: i64,
    /// Barycentric weight of the first vertex.
    pub vertex_weight1: f64,
    /// Barycentric weight of the second vertex.
    pub vertex_weight2: f64,
    /// Barycentric weight of the third vertex.
    pub vertex_weight3: f64,
}

/// `ItemPinRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPinRequest {
    /// Pin (`true`) or unpin (`false`).
    pub pin: bool,
    /// Item instance to pin.
    #[serde(rename = "itemInstanceID")]
    pub item_instance_id: String,
    /// Reference frame for `angle`.
    pub angle_relative_to: String,
    /// Reference frame for `size`.
    pub size_relative_to: String,
    /// How the vertex is chosen.
    pub vertex_pin_type: String,
    /// Mesh anchor.
    pub pin_info: PinInfo,
}

impl ItemPinRequest {
    /// Pins `item_instance_id` to the triangle `vertices` of `art_mesh_id`
    /// at the barycentric `weights`.
    #[must_use]
    pub fn new(
        item_instance_id: impl Into<String>,
        model_id: impl Into<String>,
        art_mesh_id: impl Into<String>,
        vertices: [i64; 3],
        weights: [f64; 3],
    ) -> Self {
        let [vertex_id1, vertex_id2, vertex_id3] = vertices;
        let [vertex_weight1, vertex_weight2, vertex_weight3] = weights;
        Self {
            pin: true,
            item_instance_id: item_instance_id.into(),
            angle_relative_to: "RelativeToModel".to_string(),
            size_relative_to: "RelativeToWorld".to_string(),
            vertex_pin_type: "Provided".to_string(),
            pin_info: PinInfo {
                model_id: model_id.into(),
                art_mesh_id: art_mesh_id.into(),
                angle: 0.0,
                size: 0.32,
                vertex_id1,
                vertex_id2,
                vertex_id3,
                vertex_weight1,
                vertex_weight2,
                vertex_weight3,
            },
        }
    }
}

/// `EventSubscriptionRequest` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscriptionRequest {
    /// Event name, e.g. `ModelLoadedEvent`.
    pub event_name: String,
    /// Event-specific configuration.
    pub config: serde_json::Value,
}

impl EventSubscriptionRequest {
    /// Subscribes to `event_name` with an empty configuration.
    #[must_use]
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            config: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}
