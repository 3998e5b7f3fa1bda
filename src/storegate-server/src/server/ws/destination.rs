// Copyright 2023 RobustMQ Team
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

use crate::security::identity::{Role, SecurityContext};
use crate::security::policy::{Access, Decision, PathPattern};

/// Per-destination ACL for SUBSCRIBE and SEND. First match wins; a
/// destination no rule covers is refused.
#[derive(Debug, Clone)]
pub struct DestinationPolicy {
    rules: Vec<(PathPattern, Access)>,
}

impl Default for DestinationPolicy {
    fn default() -> Self {
        DestinationPolicy::new()
            .rule("/topic/admin/**", Access::HasRole(Role::Admin))
            .rule("/topic/**", Access::Authenticated)
            .rule("/queue/**", Access::Authenticated)
            .rule("/app/**", Access::Authenticated)
    }
}

impl DestinationPolicy {
    pub fn new() -> Self {
        DestinationPolicy { rules: Vec::new() }
    }

    pub fn rule(mut self, pattern: &str, access: Access) -> Self {
        self.rules.push((PathPattern::parse(pattern), access));
        self
    }

    pub fn evaluate(&self, destination: &str, context: &SecurityContext) -> Decision {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(destination))
            .map(|(_, access)| access.decide(context))
            .unwrap_or(Decision::Forbidden)
    }

    pub fn permits(&self, destination: &str, context: &SecurityContext) -> bool {
        self.evaluate(destination, context) == Decision::Permit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::identity::AuthenticatedIdentity;
    use std::collections::BTreeSet;

    fn ctx(roles: &[Role]) -> SecurityContext {
        SecurityContext::authenticated(AuthenticatedIdentity::new(
            "u",
            1,
            roles.iter().copied().collect::<BTreeSet<_>>(),
        ))
    }

    #[test]
    fn default_destinations() {
        let policy = DestinationPolicy::default();
        let anon = SecurityContext::anonymous();
        let user = ctx(&[Role::User]);
        let admin = ctx(&[Role::Admin]);

        assert!(!policy.permits("/topic/notifications", &anon));
        assert!(policy.permits("/topic/notifications", &user));
        assert!(policy.permits("/queue/tickets", &user));
        assert!(policy.permits("/app/notify", &user));

        assert_eq!(
            policy.evaluate("/topic/admin/audit", &user),
            Decision::Forbidden
        );
        assert!(policy.permits("/topic/admin/audit", &admin));

        assert_eq!(policy.evaluate("/exchange/x", &admin), Decision::Forbidden);
    }
}
