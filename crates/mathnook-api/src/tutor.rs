//! Canned tutoring replies. Template selection by keyword, not language
//! understanding.

const ADDITION_WALKTHROUGH: &str = "**Solution: 2 + 2 = 4**

**Step-by-step:**
1. Start with the first number: 2
2. Add the second number: 2
3. Combine: 2 + 2 = 4

This is basic addition. When you add two numbers together, you're combining their quantities.";

const SOLVING_GUIDANCE: &str = "I'd be happy to help you solve this problem!

**To get the best help:**
1. Please provide the complete equation or problem
2. If you have an image, make sure it's clear and well-lit
3. Let me know what topic this is related to (algebra, geometry, calculus, etc.)

**I can help with:**
- Solving equations
- Step-by-step solutions
- Explaining mathematical concepts
- Checking your work
- Providing alternative methods

Please share the specific problem you need help with!";

const CALCULUS_HELP: &str = "**Calculus Help**

You're asking about calculus concepts. Here's what I can help with:

**Derivatives:**
- Find the rate of change
- Power rule: d/dx(x^n) = n*x^(n-1)
- Chain rule and product rule

**Integrals:**
- Find the area under a curve
- Antiderivatives
- Definite and indefinite integrals

Please provide the specific function or problem you'd like me to solve!";

const ALGEBRA_HELP: &str = "**Algebra Help**

I can help you with:
- Linear equations: ax + b = c
- Quadratic equations: ax² + bx + c = 0
- Systems of equations
- Factoring and expanding
- Working with variables and exponents

Please share the specific equation or problem, and I'll provide step-by-step solutions!";

const GEOMETRY_HELP: &str = "**Geometry Help**

I can assist with:
- Triangle properties and theorems
- Circle equations and properties
- Area and perimeter calculations
- Volume and surface area
- Coordinate geometry
- Proofs and logical reasoning

Please describe the shape or problem you need help with!";

const IMAGE_ACKNOWLEDGEMENT: &str = "I can see you've uploaded an image. Please describe what's in the image or what specific problem you need help solving.\n\n";

const DEFAULT_FOOTER: &str = "**How I can help:**
- Solve equations and problems
- Explain mathematical concepts
- Provide step-by-step solutions
- Help with homework
- Prepare for tests

**Topics I cover:**
- Algebra
- Geometry
- Trigonometry
- Calculus
- Statistics
- Pre-Calculus

Please provide more details about what you need help with!";

/// Trigger words and their reply, in priority order. First match wins.
const TOPICS: &[(&[&str], &str)] = &[
    (&["2+2", "2 + 2"], ADDITION_WALKTHROUGH),
    (&["solve"], SOLVING_GUIDANCE),
    (&["derivative", "integral"], CALCULUS_HELP),
    (&["algebra", "equation"], ALGEBRA_HELP),
    (&["geometry", "triangle", "circle"], GEOMETRY_HELP),
];

pub fn generate_math_response(message: &str, has_image: bool) -> String {
    let lower = message.to_lowercase();

    for (triggers, reply) in TOPICS {
        if triggers.iter().any(|t| lower.contains(t)) {
            return (*reply).to_string();
        }
    }

    let mut response = format!(
        "**Math Tutoring Assistant**\n\nI received your question: \"{}\"\n\n",
        message
    );
    if has_image {
        response.push_str(IMAGE_ACKNOWLEDGEMENT);
    }
    response.push_str(DEFAULT_FOOTER);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_walkthrough_for_two_plus_two() {
        let reply = generate_math_response("What is 2+2?", false);
        assert!(reply.contains("2 + 2"));
        assert!(reply.starts_with("**Solution: 2 + 2 = 4**"));
        assert_eq!(generate_math_response("what is 2 + 2", false), reply);
    }

    #[test]
    fn solve_is_case_insensitive() {
        let reply = generate_math_response("SOLVE for x", false);
        assert!(reply.contains("I'd be happy to help you solve this problem"));
    }

    #[test]
    fn priority_order_is_respected() {
        // "solve" outranks "equation"
        assert_eq!(generate_math_response("solve this equation", false), SOLVING_GUIDANCE);
        // addition outranks everything
        assert_eq!(generate_math_response("solve 2+2 on a circle", false), ADDITION_WALKTHROUGH);
        // calculus outranks geometry
        assert_eq!(generate_math_response("integral over a circle", false), CALCULUS_HELP);
    }

    #[test]
    fn each_topic_has_a_trigger() {
        assert_eq!(generate_math_response("Find the derivative", false), CALCULUS_HELP);
        assert_eq!(generate_math_response("linear algebra", false), ALGEBRA_HELP);
        assert_eq!(generate_math_response("Right TRIANGLE", false), GEOMETRY_HELP);
        assert_eq!(generate_math_response("geometry homework", false), GEOMETRY_HELP);
    }

    #[test]
    fn unknown_message_is_echoed_verbatim() {
        let reply = generate_math_response("Tell me about Primes!", false);
        assert!(reply.contains("I received your question: \"Tell me about Primes!\""));
        assert!(!reply.contains("uploaded an image"));
        assert!(reply.ends_with("Please provide more details about what you need help with!"));
    }

    #[test]
    fn image_is_acknowledged_only_in_default_reply() {
        let reply = generate_math_response("what is this?", true);
        assert!(reply.contains("I can see you've uploaded an image."));

        let reply = generate_math_response("Solve this problem", true);
        assert!(!reply.contains("uploaded an image"));
    }

    #[test]
    fn empty_message_gets_default_reply() {
        let reply = generate_math_response("", false);
        assert!(reply.contains("I received your question: \"\""));
    }
}
