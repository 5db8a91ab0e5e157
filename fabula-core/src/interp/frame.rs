use std::sync::Arc;

use fabula_doc::Command;

/// One execution frame: a scene's resolved command list and a cursor.
#[derive(Debug, Clone)]
pub struct Frame {
    pub scene_id: String,
    pub commands: Arc<[Command]>,
    pub pc: usize,
}

impl Frame {
    pub fn new(scene_id: impl Into<String>, commands: impl Into<Arc<[Command]>>, pc: usize) -> Self {
        Self {
            scene_id: scene_id.into(),
            commands: commands.into(),
            pc,
        }
    }

    pub fn current(&self) -> Option<&Command> {
        self.commands.get(self.pc)
    }

    pub fn advance(&mut self) {
        self.pc += 1;
    }
}
