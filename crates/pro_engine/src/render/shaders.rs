//! Built-in GLSL programs
//!
//! Every program reads the camera block at binding 0 and, where lit, the
//! light block at binding 1. Mesh attributes occupy locations 0-3; the
//! instanced program reads per-instance data from location 4 onwards.

/// Named vertex/fragment source pair
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource {
    /// Program name
    pub name: &'static str,
    /// Vertex stage
    pub vertex: &'static str,
    /// Fragment stage
    pub fragment: &'static str,
}

macro_rules! version {
    () => {
        "#version 450 core\n"
    };
}

macro_rules! camera_block {
    () => {
        "layout(std140, binding = 0) uniform Camera { mat4 u_ViewProjection; vec3 u_CameraPosition; float u_Padding; };\n"
    };
}

macro_rules! light_block {
    () => {
        "layout(std140, binding = 1) uniform Light { vec3 u_PointLightPosition; float u_PointLightIntensity; vec3 u_AmbientLightColor; float u_AmbientLightIntensity; };\n"
    };
}

/// Lit, textured single-mesh program
pub const MESH: ShaderSource = ShaderSource {
    name: "Renderer3D_Mesh",
    vertex: concat!(
        version!(),
        "layout(location = 0) in vec3 a_Position;\n",
        "layout(location = 1) in vec3 a_Normal;\n",
        "layout(location = 2) in vec3 a_Tangent;\n",
        "layout(location = 3) in vec2 a_TexCoord;\n",
        camera_block!(),
        "uniform mat4 u_Transform;\n",
        "out vec3 v_WorldPos; out vec3 v_Normal; out vec2 v_TexCoord;\n",
        "void main() {\n",
        "    vec4 world = u_Transform * vec4(a_Position, 1.0);\n",
        "    v_WorldPos = world.xyz;\n",
        "    v_Normal = mat3(u_Transform) * a_Normal;\n",
        "    v_TexCoord = a_TexCoord;\n",
        "    gl_Position = u_ViewProjection * world;\n",
        "}\n",
    ),
    fragment: concat!(
        version!(),
        "in vec3 v_WorldPos; in vec3 v_Normal; in vec2 v_TexCoord;\n",
        "layout(location = 0) out vec4 o_Color;\n",
        "layout(location = 1) out int o_EntityID;\n",
        light_block!(),
        "uniform vec4 u_MaterialAlbedoColor;\n",
        "uniform float u_MaterialMetallic;\n",
        "uniform float u_MaterialRoughness;\n",
        "uniform sampler2D u_AlbedoMap;\n",
        "uniform int u_EntityID;\n",
        "void main() {\n",
        "    vec4 albedo = texture(u_AlbedoMap, v_TexCoord) * u_MaterialAlbedoColor;\n",
        "    vec3 n = normalize(v_Normal);\n",
        "    float diffuse = max(dot(n, normalize(u_PointLightPosition - v_WorldPos)), 0.0) * u_PointLightIntensity;\n",
        "    vec3 ambient = u_AmbientLightColor * u_AmbientLightIntensity;\n",
        "    o_Color = vec4(albedo.rgb * (ambient + vec3(diffuse)), albedo.a);\n",
        "    o_EntityID = u_EntityID;\n",
        "}\n",
    ),
};

/// Flat-colored wireframe program
pub const WIREFRAME: ShaderSource = ShaderSource {
    name: "Renderer3D_Wireframe",
    vertex: concat!(
        version!(),
        "layout(location = 0) in vec3 a_Position;\n",
        camera_block!(),
        "uniform mat4 u_Transform;\n",
        "void main() { gl_Position = u_ViewProjection * u_Transform * vec4(a_Position, 1.0); }\n",
    ),
    fragment: concat!(
        version!(),
        "layout(location = 0) out vec4 o_Color;\n",
        "layout(location = 1) out int o_EntityID;\n",
        "uniform vec4 u_Color;\n",
        "uniform int u_EntityID;\n",
        "void main() { o_Color = u_Color; o_EntityID = u_EntityID; }\n",
    ),
};

/// Debug line program
pub const LINE: ShaderSource = ShaderSource {
    name: "Renderer3D_Line",
    vertex: concat!(
        version!(),
        "layout(location = 0) in vec3 a_Position;\n",
        "layout(location = 1) in vec4 a_Color;\n",
        "layout(location = 2) in int a_EntityID;\n",
        camera_block!(),
        "out vec4 v_Color; flat out int v_EntityID;\n",
        "void main() {\n",
        "    v_Color = a_Color; v_EntityID = a_EntityID;\n",
        "    gl_Position = u_ViewProjection * vec4(a_Position, 1.0);\n",
        "}\n",
    ),
    fragment: concat!(
        version!(),
        "in vec4 v_Color; flat in int v_EntityID;\n",
        "layout(location = 0) out vec4 o_Color;\n",
        "layout(location = 1) out int o_EntityID;\n",
        "void main() { o_Color = v_Color; o_EntityID = v_EntityID; }\n",
    ),
};

/// Instanced program; per-instance matrix, color and custom data
pub const INSTANCED: ShaderSource = ShaderSource {
    name: "InstancedMesh",
    vertex: concat!(
        version!(),
        "layout(location = 0) in vec3 a_Position;\n",
        "layout(location = 1) in vec3 a_Normal;\n",
        "layout(location = 2) in vec3 a_Tangent;\n",
        "layout(location = 3) in vec2 a_TexCoord;\n",
        "layout(location = 4) in mat4 a_InstanceMatrix;\n",
        "layout(location = 8) in vec4 a_InstanceColor;\n",
        "layout(location = 9) in vec4 a_InstanceCustomData;\n",
        camera_block!(),
        "out vec3 v_WorldPos; out vec3 v_Normal; out vec2 v_TexCoord;\n",
        "out vec4 v_InstanceColor; out vec4 v_CustomData;\n",
        "void main() {\n",
        "    vec4 world = a_InstanceMatrix * vec4(a_Position, 1.0);\n",
        "    v_WorldPos = world.xyz;\n",
        "    v_Normal = mat3(a_InstanceMatrix) * a_Normal;\n",
        "    v_TexCoord = a_TexCoord;\n",
        "    v_InstanceColor = a_InstanceColor;\n",
        "    v_CustomData = a_InstanceCustomData;\n",
        "    gl_Position = u_ViewProjection * world;\n",
        "}\n",
    ),
    fragment: concat!(
        version!(),
        "layout(early_fragment_tests) in;\n",
        "in vec3 v_WorldPos; in vec3 v_Normal; in vec2 v_TexCoord;\n",
        "in vec4 v_InstanceColor; in vec4 v_CustomData;\n",
        "layout(location = 0) out vec4 o_Color;\n",
        light_block!(),
        "uniform sampler2D u_AlbedoMap;\n",
        "void main() {\n",
        "    vec4 albedo = texture(u_AlbedoMap, v_TexCoord) * v_InstanceColor;\n",
        "    vec3 n = normalize(v_Normal);\n",
        "    float diffuse = max(dot(n, normalize(u_PointLightPosition - v_WorldPos)), 0.0) * u_PointLightIntensity;\n",
        "    vec3 ambient = u_AmbientLightColor * u_AmbientLightIntensity;\n",
        "    o_Color = vec4(albedo.rgb * (ambient + vec3(diffuse)), albedo.a);\n",
        "}\n",
    ),
};
