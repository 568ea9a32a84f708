//! Scenario tests on a fake FreeRTOS image.
