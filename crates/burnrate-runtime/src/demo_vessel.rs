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

use burnrate_core::{HostScene, Part, VesselContext};

/// A vessel in flight that is always under control and never changes.
pub struct DemoVessel {
    parts: Vec<Part>,
}

impl DemoVessel {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }
}

impl VesselContext for DemoVessel {
    fn scene(&self) -> HostScene {
        HostScene::Flight
    }

    fn is_controlled(&self) -> bool {
        true
    }

    fn parts(&self) -> Vec<Part> {
        self.parts.clone()
    }
}
