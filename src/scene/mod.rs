mod assembly;
pub mod test_scene;

pub use assembly::{CharacterAssembly, NodeKind, SceneNode, SpawnPoint};
