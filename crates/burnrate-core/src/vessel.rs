// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Host-side queries about the vessel whose stages are being simulated.

use crate::simulation::Part;

/// The kind of scene the host is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostScene {
    /// The vessel is being assembled; it always counts as the subject.
    Editor,
    /// The vessel exists in flight and may or may not be the one under control.
    #[default]
    Flight,
}

/// What the stage statistics agent needs to know about its vessel.
///
/// Implemented by the host. The agent calls it from the driving thread only.
pub trait VesselContext: Send + Sync {
    /// The scene the host is in.
    fn scene(&self) -> HostScene;

    /// Whether this vessel is the one the player currently controls.
    fn is_controlled(&self) -> bool;

    /// The vessel's parts, in the host's stage order. Fetched fresh for every run.
    fn parts(&self) -> Vec<Part>;

    /// Whether a refresh may be dispatched for this vessel right now.
    fn is_subject(&self) -> bool {
        self.scene() == HostScene::Editor || self.is_controlled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        scene: HostScene,
        controlled: bool,
    }

    impl VesselContext for Fixed {
        fn scene(&self) -> HostScene {
            self.scene
        }
        fn is_controlled(&self) -> bool {
            self.controlled
        }
        fn parts(&self) -> Vec<Part> {
            Vec::new()
        }
    }

    #[test]
    fn editor_vessels_are_always_the_subject() {
        let vessel = Fixed {
            scene: HostScene::Editor,
            controlled: false,
        };
        assert!(vessel.is_subject());
    }

    #[test]
    fn flight_vessels_must_be_controlled() {
        let idle = Fixed {
            scene: HostScene::Flight,
            controlled: false,
        };
        let active = Fixed {
            scene: HostScene::Flight,
            controlled: true,
        };
        assert!(!idle.is_subject());
        assert!(active.is_subject());
    }
}
